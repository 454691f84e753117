//! Headless Chrome driver built on `chromiumoxide`.
//!
//! Every [`Browser::open`] launches its own Chrome process with a throwaway
//! profile directory, so sessions never share cookies or local storage. The
//! process is shut down in [`Session::close`]; dropping a session without
//! closing it still kills the process and stops the CDP handler task.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as Chrome, BrowserConfig, HeadlessMode};
use chromiumoxide::error::CdpError;
use chromiumoxide::{cdp, Element, Page};
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::http::get_json;
use super::{Browser, Node, Session, SessionProfile};
use crate::error::ScraperError;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--hide-scrollbars",
    "--mute-audio",
    "--password-store=basic",
];

/// Launch settings for [`ChromiumBrowser`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub headless: bool,
    /// Chrome binary; `None` lets `chromiumoxide` search the usual paths.
    pub executable: Option<PathBuf>,
    /// Upper bound for a single CDP request, navigation included.
    pub request_timeout: Duration,
}

pub struct ChromiumBrowser {
    options: ChromiumOptions,
    client: Client,
}

impl ChromiumBrowser {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client used for JSON fetches
    /// cannot be constructed.
    pub fn new(options: ChromiumOptions) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { options, client })
    }

    fn config(
        &self,
        profile: &SessionProfile,
        user_data_dir: PathBuf,
    ) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.options.request_timeout)
            .window_size(profile.viewport.width, profile.viewport.height)
            .user_data_dir(user_data_dir);

        builder = if self.options.headless {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };

        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path.clone());
        }

        builder = builder
            .arg(format!("--user-agent={}", profile.user_agent))
            .arg(format!("--lang={}", primary_language(&profile.accept_language)));
        for arg in STEALTH_ARGS {
            builder = builder.arg(*arg);
        }

        builder.build().map_err(ScraperError::Browser)
    }
}

/// First tag of an `Accept-Language` value, e.g. `es-ES` from
/// `es-ES,es;q=0.9`.
fn primary_language(accept_language: &str) -> &str {
    accept_language
        .split([',', ';'])
        .next()
        .map_or("", str::trim)
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn Session>, ScraperError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("cotiza-chrome-")
            .tempdir()
            .map_err(|e| ScraperError::Browser(format!("profile directory: {e}")))?;

        let config = self.config(profile, profile_dir.path().to_path_buf())?;
        let (mut browser, mut handler) = Chrome::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "cdp handler event error");
                }
            }
        });

        let page = match prepare_page(&browser, profile).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = shut_down(&mut browser, &handler).await {
                    tracing::debug!(error = %close_err, "chrome did not accept close");
                }
                return Err(e);
            }
        };

        tracing::debug!(
            profile_dir = %profile_dir.path().display(),
            headless = self.options.headless,
            "chromium session opened"
        );

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(browser),
            handler,
            page,
            client: self.client.clone(),
            profile: profile.clone(),
            _profile_dir: profile_dir,
        }))
    }
}

/// Opens a blank page and applies the session identity before any site
/// script can observe it.
async fn prepare_page(browser: &Chrome, profile: &SessionProfile) -> Result<Page, ScraperError> {
    let page = browser.new_page("about:blank").await?;

    page.execute(cdp::browser_protocol::network::SetUserAgentOverrideParams {
        user_agent: profile.user_agent.clone(),
        accept_language: Some(profile.accept_language.clone()),
        platform: None,
        user_agent_metadata: None,
    })
    .await?;

    let metrics = cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(profile.viewport.width))
        .height(i64::from(profile.viewport.height))
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(ScraperError::Browser)?;
    page.execute(metrics).await?;

    if profile.hide_webdriver {
        page.execute(
            cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams {
                source: HIDE_WEBDRIVER_JS.to_string(),
                include_command_line_api: None,
                world_name: None,
                run_immediately: None,
            },
        )
        .await?;
    }

    Ok(page)
}

struct ChromiumSession {
    // Only touched in `close`, through `get_mut`.
    browser: Mutex<Chrome>,
    handler: JoinHandle<()>,
    page: Page,
    client: Client,
    profile: SessionProfile,
    _profile_dir: tempfile::TempDir,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        let timed_out = || ScraperError::NavigationTimeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        };

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(CdpError::Timeout)) | Err(_) => Err(timed_out()),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
        let elements = self.page.find_elements(selector).await?;
        Ok(wrap_elements(elements))
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, ScraperError> {
        let start = Instant::now();
        loop {
            match self.page.find_elements(selector).await {
                Ok(found) if !found.is_empty() => return Ok(true),
                Ok(_) => {}
                // The document may be mid-navigation; keep polling.
                Err(e) => tracing::trace!(selector, error = %e, "wait_for poll failed"),
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        let result = self.page.evaluate(script).await?;
        // Scripts that return `undefined` carry no value.
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn fetch_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScraperError> {
        get_json(&self.client, &self.profile, url, timeout).await
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        shut_down(self.browser.get_mut(), &self.handler).await
    }
}

/// Closes Chrome, waits for the process and stops the CDP handler. Only the
/// close result is returned; a failed wait is logged.
async fn shut_down(browser: &mut Chrome, handler: &JoinHandle<()>) -> Result<(), ScraperError> {
    let closed = browser.close().await;
    if let Err(e) = browser.wait().await {
        tracing::debug!(error = %e, "chrome process did not exit cleanly");
    }
    handler.abort();
    closed.map(|_| ()).map_err(Into::into)
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn wrap_elements(elements: Vec<Element>) -> Vec<Box<dyn Node>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromiumNode { element }) as Box<dyn Node>)
        .collect()
}

struct ChromiumNode {
    element: Element,
}

#[async_trait]
impl Node for ChromiumNode {
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
        let elements = self.element.find_elements(selector).await?;
        Ok(wrap_elements(elements))
    }

    async fn text(&self) -> Result<String, ScraperError> {
        Ok(self.element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(self.element.attribute(name).await?)
    }

    async fn ancestor_texts(&self, levels: usize) -> Result<Vec<String>, ScraperError> {
        let script = format!(
            "function() {{
                const out = [];
                let node = this.parentElement;
                for (let i = 0; i < {levels} && node; i++) {{
                    const text = (node.innerText || '').trim();
                    if (text) out.push(text);
                    node = node.parentElement;
                }}
                return JSON.stringify(out);
            }}"
        );
        let returns = self.element.call_js_fn(script, false).await?;
        let Some(serde_json::Value::String(json)) = returns.result.value else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&json).map_err(|source| ScraperError::Deserialize {
            context: "ancestor texts".to_string(),
            source,
        })
    }

    async fn type_and_submit(&self, text: &str) -> Result<(), ScraperError> {
        self.element.click().await?;
        self.element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        self.element.type_str(text).await?;
        self.element.press_key("Enter").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Viewport;

    fn profile() -> SessionProfile {
        SessionProfile {
            user_agent: "TestAgent/1.0".to_string(),
            accept_language: "es-ES,es;q=0.9".to_string(),
            viewport: Viewport::default(),
            hide_webdriver: true,
        }
    }

    #[test]
    fn primary_language_takes_first_tag() {
        assert_eq!(primary_language("es-ES,es;q=0.9"), "es-ES");
        assert_eq!(primary_language("es"), "es");
        assert_eq!(primary_language(" en-US ;q=1"), "en-US");
        assert_eq!(primary_language(""), "");
    }

    #[test]
    fn config_builds_for_headless_and_headful() {
        for headless in [true, false] {
            let browser = ChromiumBrowser::new(ChromiumOptions {
                headless,
                executable: Some(PathBuf::from("/usr/bin/chromium")),
                request_timeout: Duration::from_secs(5),
            })
            .expect("client builds");
            let config = browser.config(&profile(), std::env::temp_dir());
            assert!(config.is_ok(), "headless={headless}");
        }
    }

    #[tokio::test]
    async fn open_reports_a_missing_chrome_binary() {
        let browser = ChromiumBrowser::new(ChromiumOptions {
            headless: true,
            executable: Some(PathBuf::from("/nonexistent/cotiza/chrome")),
            request_timeout: Duration::from_secs(5),
        })
        .expect("client builds");
        assert!(browser.open(&profile()).await.is_err());
    }
}
