//! Browser-automation capability consumed by the store scrapers.
//!
//! Scrapers only see the [`Browser`], [`Session`] and [`Node`] traits. Two
//! drivers implement them: [`ChromiumBrowser`] drives headless Chrome and
//! runs page scripts; [`HttpBrowser`] fetches pages over plain HTTP and
//! parses the static markup.

mod chromium;
mod http;

use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{AppConfig, BrowserDriver};

use crate::error::ScraperError;

pub use chromium::{ChromiumBrowser, ChromiumOptions};
pub use http::HttpBrowser;

#[cfg(test)]
pub(crate) use http::static_session;

/// Browser identity applied to every new session.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: Viewport,
    /// Hide `navigator.webdriver` before any page script runs.
    pub hide_webdriver: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl SessionProfile {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.scraper_user_agent.clone(),
            accept_language: config.scraper_accept_language.clone(),
            viewport: Viewport::default(),
            hide_webdriver: true,
        }
    }
}

/// Launches isolated sessions. Implementations must not share cookies or
/// storage between sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn Session>, ScraperError>;
}

/// One isolated page. Every wait is bounded by its `timeout` argument.
#[async_trait]
pub trait Session: Send + Sync {
    /// Loads `url`. Returns [`ScraperError::NavigationTimeout`] when the page
    /// did not finish loading in time; whatever did load stays queryable.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// All nodes matching a CSS selector, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError>;

    /// Polls until `selector` matches something or `timeout` elapses.
    /// `Ok(false)` means it never appeared.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, ScraperError>;

    /// Runs a script in page context and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    /// Fixed settle delay between interactions.
    async fn pause(&self, duration: Duration);

    /// GETs a JSON document with this session's identity headers.
    async fn fetch_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScraperError>;

    /// Releases the page and the browser behind it.
    async fn close(&mut self) -> Result<(), ScraperError>;
}

/// One element of a loaded page.
#[async_trait]
pub trait Node: Send + Sync {
    /// Descendants matching a CSS selector. Never includes the node itself.
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError>;

    /// Rendered text, one line per block.
    async fn text(&self) -> Result<String, ScraperError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError>;

    /// Text of up to `levels` ancestors, nearest first. Ancestors without
    /// text are skipped.
    async fn ancestor_texts(&self, levels: usize) -> Result<Vec<String>, ScraperError>;

    /// Focuses the node, types `text` and presses Enter.
    async fn type_and_submit(&self, text: &str) -> Result<(), ScraperError>;
}

/// Scrolls the page down `steps` times by `step_px`, pausing after each step
/// so lazy-loaded cards can render. The last step lands at
/// `steps * step_px`. Scroll failures end the loop early.
pub async fn scroll_in_steps(session: &dyn Session, steps: u32, step_px: u32, pause: Duration) {
    for i in 1..=steps {
        let y = u64::from(i) * u64::from(step_px);
        if let Err(e) = session.evaluate(&format!("window.scrollTo(0, {y})")).await {
            tracing::debug!(error = %e, "scroll step skipped");
            break;
        }
        session.pause(pause).await;
    }
}

/// Builds the browser driver selected in configuration.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the driver's HTTP client cannot be built.
pub fn build_browser(config: &AppConfig) -> Result<Box<dyn Browser>, ScraperError> {
    match config.browser_driver {
        BrowserDriver::Chromium => Ok(Box::new(ChromiumBrowser::new(ChromiumOptions {
            headless: config.browser_headless,
            executable: config.chrome_executable.clone(),
            request_timeout: Duration::from_secs(config.scraper_navigation_timeout_secs),
        })?)),
        BrowserDriver::Http => Ok(Box::new(HttpBrowser::new()?)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct ScrollRecorder {
        scripts: Mutex<Vec<String>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl Session for ScrollRecorder {
        async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), ScraperError> {
            Ok(())
        }

        async fn query(&self, _selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
            Ok(Vec::new())
        }

        async fn wait_for(&self, _selector: &str, _timeout: Duration) -> Result<bool, ScraperError> {
            Ok(false)
        }

        async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
            let mut scripts = self.scripts.lock().expect("scripts lock");
            if self.fail_after.is_some_and(|n| scripts.len() >= n) {
                return Err(ScraperError::Extraction("page gone".to_string()));
            }
            scripts.push(script.to_string());
            Ok(serde_json::Value::Null)
        }

        async fn pause(&self, _duration: Duration) {}

        async fn fetch_json(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<serde_json::Value, ScraperError> {
            Ok(serde_json::Value::Null)
        }

        async fn close(&mut self) -> Result<(), ScraperError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn scroll_in_steps_moves_down_on_every_step() {
        let session = ScrollRecorder::default();
        scroll_in_steps(&session, 5, 800, Duration::ZERO).await;

        let scripts = session.scripts.lock().expect("scripts lock");
        assert_eq!(scripts.len(), 5);
        assert_eq!(scripts[0], "window.scrollTo(0, 800)");
        assert_eq!(scripts[4], "window.scrollTo(0, 4000)");
    }

    #[tokio::test]
    async fn scroll_in_steps_stops_at_first_failure() {
        let session = ScrollRecorder {
            fail_after: Some(2),
            ..ScrollRecorder::default()
        };
        scroll_in_steps(&session, 8, 800, Duration::ZERO).await;

        let scripts = session.scripts.lock().expect("scripts lock");
        assert_eq!(*scripts, ["window.scrollTo(0, 800)", "window.scrollTo(0, 1600)"]);
    }
}
