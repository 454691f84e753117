//! One scraper per retailer behind the [`StoreScraper`] contract.
//!
//! Scrapers never fail: navigation timeouts, missing selectors and broken
//! cards are logged and skipped, and a scrape that cannot run at all returns
//! whatever it had gathered (usually nothing). Every scrape gets a fresh
//! browser session that is closed on every exit path.

mod curacao;
mod prismamoda;
mod selectos;
mod siman;
mod vidri;
mod walmart;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{AppConfig, Branch, ProductResult, Store};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::browser::{Browser, Session, SessionProfile};
use crate::error::ScraperError;
use crate::extract::ResultSet;

pub use curacao::CuracaoScraper;
pub use prismamoda::PrismaModaScraper;
pub use selectos::SelectosScraper;
pub use siman::SimanScraper;
pub use vidri::VidriScraper;
pub use walmart::WalmartScraper;

pub const DEFAULT_MAX_ITEMS: usize = 20;
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters left unescaped in search terms, matching what storefront
/// search boxes produce.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Common contract of every retailer scraper.
#[async_trait]
pub trait StoreScraper: Send + Sync {
    fn store(&self) -> Store;

    /// Searches the storefront for `query`. Returns at most the configured
    /// maximum of results, in page order, unique by URL. Consolidated
    /// scrapers may return up to that maximum per branch.
    async fn scrape(&self, query: &str) -> Vec<ProductResult>;
}

#[derive(Debug, Clone)]
pub struct ScraperOptions {
    pub max_items: usize,
    pub navigation_timeout: Duration,
    /// Replaces every store's base URL. Used to point scrapers at fixture
    /// servers.
    pub base_url: Option<Url>,
    /// Vidrí DOM search also keeps category and promotion pages.
    pub include_category_pages: bool,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            base_url: None,
            include_category_pages: false,
        }
    }
}

impl ScraperOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_items: config.scraper_max_items,
            navigation_timeout: Duration::from_secs(config.scraper_navigation_timeout_secs),
            base_url: None,
            include_category_pages: config.scraper_include_categories,
        }
    }
}

/// Everything a scraper needs to open sessions.
#[derive(Clone)]
pub struct ScrapeContext {
    pub browser: Arc<dyn Browser>,
    pub profile: SessionProfile,
    pub options: ScraperOptions,
}

impl ScrapeContext {
    /// The store's base URL, or the configured override.
    fn base_url(&self, default: &str) -> Result<Url, ScraperError> {
        match &self.options.base_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(default).map_err(|e| ScraperError::InvalidUrl {
                url: default.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Builds the scraper for `store`. `branches` is only used by Walmart.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if a base URL cannot be parsed.
pub fn build_scraper(
    store: Store,
    ctx: ScrapeContext,
    branches: &[Branch],
) -> Result<Box<dyn StoreScraper>, ScraperError> {
    Ok(match store {
        Store::Siman => Box::new(SimanScraper::new(ctx)?),
        Store::Curacao => Box::new(CuracaoScraper::new(ctx)?),
        Store::Walmart => Box::new(WalmartScraper::new(ctx, branches.to_vec())?),
        Store::PrismaModa => Box::new(PrismaModaScraper::new(ctx)?),
        Store::Selectos => Box::new(SelectosScraper::new(ctx)?),
        Store::Vidri => Box::new(VidriScraper::new(ctx)?),
    })
}

/// The page work of one scrape, run inside a session owned by
/// [`run_in_session`].
#[async_trait]
pub(crate) trait SessionScrape: Sync {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError>;
}

/// Opens a session, runs `job`, and closes the session whatever happened.
/// A failing job keeps the results it had already gathered.
pub(crate) async fn run_in_session(
    ctx: &ScrapeContext,
    store: Store,
    job: &dyn SessionScrape,
    query: &str,
) -> Vec<ProductResult> {
    let mut out = ResultSet::new(ctx.options.max_items);

    let mut session = match ctx.browser.open(&ctx.profile).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(store = %store, error = %e, "could not open browser session");
            return Vec::new();
        }
    };

    let outcome = job.collect(session.as_mut(), query, &mut out).await;

    if let Err(e) = session.close().await {
        tracing::debug!(store = %store, error = %e, "session teardown failed");
    }

    if let Err(e) = outcome {
        tracing::warn!(store = %store, query, kept = out.len(), error = %e, "scrape aborted");
    }
    out.into_vec()
}

/// Navigates and swallows failures: the page keeps whatever loaded and
/// extraction decides if anything is usable.
pub(crate) async fn navigate_lenient(
    session: &mut dyn Session,
    url: &str,
    timeout: Duration,
    store: Store,
) {
    match session.navigate(url, timeout).await {
        Ok(()) => {}
        Err(e @ ScraperError::NavigationTimeout { .. }) => {
            tracing::debug!(store = %store, url, error = %e, "navigation timed out, continuing");
        }
        Err(e) => tracing::warn!(store = %store, url, error = %e, "navigation failed"),
    }
}

/// Waits for `selector`, or sleeps `fallback` if it never shows up.
pub(crate) async fn settle(
    session: &dyn Session,
    selector: &str,
    timeout: Duration,
    fallback: Duration,
) {
    match session.wait_for(selector, timeout).await {
        Ok(true) => {}
        Ok(false) => session.pause(fallback).await,
        Err(e) => {
            tracing::debug!(selector, error = %e, "content wait failed");
            session.pause(fallback).await;
        }
    }
}

pub(crate) fn encode_query(query: &str) -> String {
    utf8_percent_encode(query.trim(), QUERY_ENCODE).to_string()
}

/// `base` joined with a path that may carry a query string or fragment.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!("{}{path}", base.as_str().trim_end_matches('/'))
}

pub(crate) fn skip_candidate(store: Store, index: usize, error: &ScraperError) {
    tracing::debug!(store = %store, index, error = %error, "skipping candidate");
}
