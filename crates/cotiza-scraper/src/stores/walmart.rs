use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{Branch, ProductResult, Store};
use url::Url;

use super::{
    encode_query, endpoint, navigate_lenient, run_in_session, skip_candidate, ScrapeContext,
    SessionScrape, StoreScraper,
};
use crate::browser::{scroll_in_steps, Node, Session};
use crate::consolidate::Consolidator;
use crate::error::ScraperError;
use crate::extract::{image_src, resolve_href, ResultSet};
use crate::price::extract_prices;
use crate::relevance::RelevancePolicy;
use crate::text::{clean_name, Boilerplate};

const BASE: &str = "https://www.walmart.com.sv";
const STORE: Store = Store::Walmart;

/// Local-storage key the storefront reads to pick the selling branch.
const SELLER_STORAGE_KEY: &str = "verifySelectedSeller";

const GALLERY_CARD: &str = ".vtex-search-result-3-x-galleryItem section";
const GALLERY_WAIT: Duration = Duration::from_secs(15);
const SELLER_SETTLE: Duration = Duration::from_secs(2);
const SEARCH_SETTLE: Duration = Duration::from_secs(5);
const SCROLL_STEPS: u32 = 5;
const SCROLL_STEP_PX: u32 = 800;
const SCROLL_PAUSE: Duration = Duration::from_millis(1500);

const ARIA_PREFIXES: &[&str] = &["View product details for ", "Ver detalles del producto "];
const NAME_SELECTORS: &[&str] = &[
    "span.vtex-product-summary-2-x-productBrand",
    "span[class*='productName']",
    "h3",
    "h2",
];
const MIN_NAME_CHARS: usize = 5;

/// Button labels that identify the card's cart action.
const ACTION_WORDS: &[&str] = &["agregar", "agotado", "out of stock", "sin stock", "añadir", "comprar"];
const OUT_OF_STOCK_WORDS: &[&str] = &["agotado", "out of stock", "sin stock", "no disponible"];

/// Walmart El Salvador. Each branch has its own catalogue, so the search
/// runs once per branch and the listings are consolidated.
pub struct WalmartScraper {
    ctx: ScrapeContext,
    base: Url,
    branches: Vec<Branch>,
    boilerplate: Boilerplate,
}

/// One branch's search, pinned through local storage.
struct BranchSearch<'a> {
    scraper: &'a WalmartScraper,
    branch: &'a Branch,
}

impl WalmartScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext, branches: Vec<Branch>) -> Result<Self, ScraperError> {
        Ok(Self {
            base: ctx.base_url(BASE)?,
            ctx,
            branches,
            boilerplate: Boilerplate::new(&["Agregar", r"\$\d", "Agotado"]),
        })
    }

    async fn card(&self, node: &dyn Node, query: &str) -> Result<Option<ProductResult>, ScraperError> {
        if is_out_of_stock(node).await? {
            return Ok(None);
        }

        let Some(link) = node.query("a").await?.into_iter().next() else {
            return Ok(None);
        };
        let Some(url) = link
            .attribute("href")
            .await?
            .and_then(|href| resolve_href(&self.base, &href))
        else {
            return Ok(None);
        };

        let aria = link.attribute("aria-label").await?.map(|label| strip_aria_prefix(&label));
        let raw_name = match aria {
            Some(name) if name.chars().count() >= MIN_NAME_CHARS => Some(name),
            _ => fallback_name(node).await?,
        };
        let Some(raw_name) = raw_name else {
            return Ok(None);
        };

        let prices = extract_prices(&node.text().await?);
        if prices.is_empty() {
            return Ok(None);
        }

        let name = clean_name(&raw_name, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::Majority.is_relevant(&name, query) {
            return Ok(None);
        }

        let mut product = ProductResult::new(STORE.display_name(), name, url);
        product.price_original = prices.original;
        product.price_discount = prices.discount;
        product.image = image_src(node).await?;
        Ok(Some(product))
    }
}

/// The first button carrying a cart action decides: a sold-out label means
/// the branch has no stock.
async fn is_out_of_stock(node: &dyn Node) -> Result<bool, ScraperError> {
    for button in node.query("button").await? {
        let label = button.text().await?.trim().to_lowercase();
        if label.is_empty() || !ACTION_WORDS.iter().any(|w| label.contains(w)) {
            continue;
        }
        return Ok(OUT_OF_STOCK_WORDS.iter().any(|w| label.contains(w)));
    }
    Ok(false)
}

fn strip_aria_prefix(label: &str) -> String {
    let label = label.trim();
    ARIA_PREFIXES
        .iter()
        .find_map(|prefix| label.strip_prefix(prefix))
        .unwrap_or(label)
        .trim()
        .to_string()
}

async fn fallback_name(node: &dyn Node) -> Result<Option<String>, ScraperError> {
    for selector in NAME_SELECTORS {
        if let Some(found) = node.query(selector).await?.first() {
            let text = found.text().await?;
            let text = text.trim();
            if text.chars().count() > MIN_NAME_CHARS && !text.contains('$') {
                return Ok(Some(text.to_string()));
            }
        }
    }
    Ok(None)
}

#[async_trait]
impl SessionScrape for BranchSearch<'_> {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let scraper = self.scraper;
        let timeout = scraper.ctx.options.navigation_timeout;

        navigate_lenient(session, scraper.base.as_str(), timeout, STORE).await;
        let seller = serde_json::to_string(&self.branch.seller_id).map_err(|source| {
            ScraperError::Deserialize {
                context: "seller id".to_string(),
                source,
            }
        })?;
        let pin = format!("localStorage.setItem('{SELLER_STORAGE_KEY}', {seller})");
        if let Err(e) = session.evaluate(&pin).await {
            tracing::warn!(store = %STORE, branch = %self.branch.key, error = %e, "could not pin branch");
        }
        session.pause(SELLER_SETTLE).await;

        let url = endpoint(&scraper.base, &format!("/{}", encode_query(query)));
        navigate_lenient(session, &url, timeout, STORE).await;
        session.pause(SEARCH_SETTLE).await;
        scroll_in_steps(session, SCROLL_STEPS, SCROLL_STEP_PX, SCROLL_PAUSE).await;
        if !session.wait_for(GALLERY_CARD, GALLERY_WAIT).await.unwrap_or(false) {
            tracing::debug!(store = %STORE, branch = %self.branch.key, "gallery never appeared");
        }

        let cards = match session.query(GALLERY_CARD).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::debug!(store = %STORE, error = %e, "gallery query failed");
                Vec::new()
            }
        };

        for (index, node) in cards.iter().enumerate() {
            if out.is_full() {
                break;
            }
            match scraper.card(node.as_ref(), query).await {
                Ok(Some(product)) => {
                    out.push(product);
                }
                Ok(None) => {}
                Err(e) => skip_candidate(STORE, index, &e),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreScraper for WalmartScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        if self.branches.is_empty() {
            tracing::warn!(store = %STORE, "no branches configured");
            return Vec::new();
        }

        let mut consolidator = Consolidator::new();
        for branch in &self.branches {
            let job = BranchSearch {
                scraper: self,
                branch,
            };
            let results = run_in_session(&self.ctx, STORE, &job, query).await;
            tracing::info!(
                store = %STORE,
                branch = %branch.key,
                seller_id = %branch.seller_id,
                count = results.len(),
                "branch scraped"
            );
            consolidator.absorb(&branch.display_name(), results);
        }

        let results = consolidator.finish();
        tracing::info!(
            store = %STORE,
            query,
            branches = self.branches.len(),
            count = results.len(),
            "scrape finished"
        );
        results
    }
}
