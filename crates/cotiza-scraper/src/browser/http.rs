//! Static-markup driver: pages are fetched with `reqwest` and parsed with
//! `scraper`. No script runs, so [`Session::evaluate`] and typing are
//! reported as [`ScraperError::Unsupported`] and settle pauses return
//! immediately.
//!
//! `scraper::Html` is not `Send`, so nodes are captured as owned fragments
//! (outer HTML, rendered text, attributes, ancestor texts) at query time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use super::{Browser, Node, Session, SessionProfile};
use crate::error::ScraperError;

const DRIVER: &str = "http";

/// Ancestor levels captured per node; the extractors never look further up.
const ANCESTOR_DEPTH: usize = 3;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open(&self, profile: &SessionProfile) -> Result<Box<dyn Session>, ScraperError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            profile: profile.clone(),
            document: String::new(),
        }))
    }
}

struct HttpSession {
    client: Client,
    profile: SessionProfile,
    document: String,
}

impl HttpSession {
    fn get_html(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, &self.profile.user_agent)
            .header(ACCEPT_LANGUAGE, &self.profile.accept_language)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
    }
}

/// GETs `url` as JSON with the profile's identity headers. Shared by both
/// drivers; storefront search APIs do not need a rendered page.
pub(super) async fn get_json(
    client: &Client,
    profile: &SessionProfile,
    url: &str,
    timeout: Duration,
) -> Result<serde_json::Value, ScraperError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .header(USER_AGENT, &profile.user_agent)
        .header(ACCEPT_LANGUAGE, &profile.accept_language)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
        context: url.to_string(),
        source,
    })
}

fn timeout_or_http(e: reqwest::Error, url: &str, timeout: Duration) -> ScraperError {
    if e.is_timeout() {
        ScraperError::NavigationTimeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        ScraperError::Http(e)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        self.document.clear();

        let response = self
            .get_html(url, timeout)
            .send()
            .await
            .map_err(|e| timeout_or_http(e, url, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        self.document = response
            .text()
            .await
            .map_err(|e| timeout_or_http(e, url, timeout))?;
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
        select_in_document(&self.document, selector)
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool, ScraperError> {
        // Static markup never changes after load.
        Ok(!select_in_document(&self.document, selector)?.is_empty())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, ScraperError> {
        Err(ScraperError::Unsupported {
            driver: DRIVER,
            operation: "script evaluation",
        })
    }

    async fn pause(&self, _duration: Duration) {}

    async fn fetch_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScraperError> {
        get_json(&self.client, &self.profile, url, timeout).await
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.document.clear();
        Ok(())
    }
}

/// An element captured from parsed markup.
struct FragmentNode {
    outer_html: String,
    text: String,
    attrs: Vec<(String, String)>,
    /// Rendered text of the nearest ancestors, nearest first. May hold
    /// empty strings for ancestors without text.
    ancestors: Vec<String>,
}

impl FragmentNode {
    fn capture(el: ElementRef<'_>, outer_ancestors: &[String]) -> Self {
        Self {
            outer_html: el.html(),
            text: rendered_text(el),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ancestors: ancestor_texts_of(el, outer_ancestors),
        }
    }
}

#[async_trait]
impl Node for FragmentNode {
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
        let selector = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.outer_html);
        Ok(fragment
            .root_element()
            .select(&selector)
            .filter(|el| !is_fragment_top(*el))
            .map(|el| Box::new(FragmentNode::capture(el, &self.ancestors)) as Box<dyn Node>)
            .collect())
    }

    async fn text(&self) -> Result<String, ScraperError> {
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(self
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone()))
    }

    async fn ancestor_texts(&self, levels: usize) -> Result<Vec<String>, ScraperError> {
        Ok(self
            .ancestors
            .iter()
            .take(levels)
            .filter(|t| !t.is_empty())
            .cloned()
            .collect())
    }

    async fn type_and_submit(&self, _text: &str) -> Result<(), ScraperError> {
        Err(ScraperError::Unsupported {
            driver: DRIVER,
            operation: "typing into inputs",
        })
    }
}

/// A session preloaded with `html`, for extractor tests that need no server.
#[cfg(test)]
pub(crate) fn static_session(html: &str) -> Box<dyn Session> {
    Box::new(HttpSession {
        client: Client::new(),
        profile: SessionProfile {
            user_agent: "cotiza-test".to_string(),
            accept_language: "es".to_string(),
            viewport: super::Viewport::default(),
            hide_webdriver: false,
        },
        document: html.to_string(),
    })
}

fn parse_selector(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn select_in_document(html: &str, selector: &str) -> Result<Vec<Box<dyn Node>>, ScraperError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| Box::new(FragmentNode::capture(el, &[])) as Box<dyn Node>)
        .collect())
}

/// The element a fragment was captured from sits directly under the
/// synthetic `<html>` root.
fn is_fragment_top(el: ElementRef<'_>) -> bool {
    el.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| p.value().name() == "html")
}

fn ancestor_texts_of(el: ElementRef<'_>, outer: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(ANCESTOR_DEPTH);
    let mut current = el.parent().and_then(ElementRef::wrap);
    while let Some(parent) = current {
        if out.len() == ANCESTOR_DEPTH {
            return out;
        }
        if parent.value().name() == "html" {
            break;
        }
        out.push(rendered_text(parent));
        current = parent.parent().and_then(ElementRef::wrap);
    }
    let remaining = ANCESTOR_DEPTH - out.len();
    out.extend(outer.iter().take(remaining).cloned());
    out
}

/// Approximates `innerText`: whitespace collapses inside inline content,
/// block elements and `<br>` start new lines, empty lines are dropped.
fn rendered_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            push_text(child_el, out);
            if block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Viewport;

    const CARD: &str = r#"
        <ul class="grid">
          <li class="card" data-sku="77">
            <a href="/licuadora-oster/p" aria-label="Licuadora Oster">
              <img src="/img/oster.jpg" alt="Licuadora">
              <h3>Licuadora
                 <b>Oster</b></h3>
            </a>
            <div class="price"><span>$</span>49.99</div>
          </li>
        </ul>"#;

    fn doc_nodes(selector: &str) -> Vec<Box<dyn Node>> {
        select_in_document(CARD, selector).expect("valid selector")
    }

    #[tokio::test]
    async fn rendered_text_breaks_lines_at_blocks_only() {
        let nodes = doc_nodes("li.card");
        assert_eq!(nodes.len(), 1);
        let text = nodes[0].text().await.unwrap();
        assert_eq!(text, "Licuadora Oster\n$49.99");
    }

    #[tokio::test]
    async fn node_query_excludes_the_node_itself() {
        let links = doc_nodes("a[href]");
        assert_eq!(links.len(), 1);
        assert!(links[0].query("a[href]").await.unwrap().is_empty());
        let imgs = links[0].query("img").await.unwrap();
        assert_eq!(imgs.len(), 1);
        assert_eq!(
            imgs[0].attribute("src").await.unwrap().as_deref(),
            Some("/img/oster.jpg")
        );
    }

    #[tokio::test]
    async fn attribute_lookup_is_case_insensitive() {
        let cards = doc_nodes("li");
        let card = &cards[0];
        assert_eq!(card.attribute("DATA-SKU").await.unwrap().as_deref(), Some("77"));
        assert_eq!(card.attribute("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ancestor_texts_walk_outward() {
        let links = doc_nodes("a[href]");
        let ancestors = links[0].ancestor_texts(3).await.unwrap();
        assert_eq!(ancestors[0], "Licuadora Oster\n$49.99");
        assert!(ancestors.len() >= 2);

        let nested = links[0].query("b").await.unwrap();
        let nested_ancestors = nested[0].ancestor_texts(3).await.unwrap();
        // h3, then the link itself, then the card
        assert_eq!(nested_ancestors[0], "Licuadora Oster");
        assert_eq!(nested_ancestors[2], "Licuadora Oster\n$49.99");
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = select_in_document(CARD, "li[").err().expect("parse error");
        assert!(matches!(err, ScraperError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn scripts_are_unsupported() {
        let browser = HttpBrowser::new().unwrap();
        let profile = SessionProfile {
            user_agent: "cotiza-test".to_string(),
            accept_language: "es".to_string(),
            viewport: Viewport::default(),
            hide_webdriver: false,
        };
        let session = browser.open(&profile).await.unwrap();
        let err = session.evaluate("1 + 1").await.unwrap_err();
        assert!(matches!(err, ScraperError::Unsupported { driver: "http", .. }));
        assert!(!session.wait_for("div", Duration::from_secs(1)).await.unwrap());
    }
}
