use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{ProductResult, Store};
use url::Url;

use super::{
    encode_query, endpoint, navigate_lenient, run_in_session, skip_candidate, ScrapeContext,
    SessionScrape, StoreScraper,
};
use crate::browser::{scroll_in_steps, Node, Session};
use crate::error::ScraperError;
use crate::extract::{
    first_name, image_src, link_href, locate_candidates, price_text, Cascade, NameSource,
    ResultSet,
};
use crate::price::extract_prices;
use crate::relevance::RelevancePolicy;
use crate::text::{clean_name, Boilerplate};

const BASE: &str = "https://www.prismamoda.com";
const STORE: Store = Store::PrismaModa;

const CARDS: Cascade = Cascade {
    primary: &[
        ".vtex-product-summary-2-x-clearLink",
        "[class*='vtex-product-summary']",
        ".vtex-search-result-3-x-galleryItem",
        "[class*='galleryItem']",
    ],
    min_count: 3,
    link_fallback: true,
};

const NAME_CHAIN: &[NameSource] = &[
    NameSource::FirstLine,
    NameSource::Attribute("title"),
    NameSource::ImageAlt,
    NameSource::Attribute("aria-label"),
];

/// Ancestors searched for a price when the card itself shows none.
const PRICE_ANCESTORS: usize = 3;

const SETTLE: Duration = Duration::from_secs(4);
const SCROLL_STEPS: u32 = 6;
const SCROLL_STEP_PX: u32 = 600;
const SCROLL_PAUSE: Duration = Duration::from_millis(400);
const IMAGE_LINK: &str = "a[href] img";
const IMAGE_LINK_WAIT: Duration = Duration::from_secs(8);

/// PrismaModa fashion storefront. Its markup shifts often, so cards go
/// through the full selector cascade.
pub struct PrismaModaScraper {
    ctx: ScrapeContext,
    base: Url,
    boilerplate: Boilerplate,
}

impl PrismaModaScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext) -> Result<Self, ScraperError> {
        Ok(Self {
            base: ctx.base_url(BASE)?,
            ctx,
            // Word-bounded so colour names like "Verde" survive.
            boilerplate: Boilerplate::new(&["Agregar", r"\$\d", "Comprar", r"\bVer\b", "Añadir"]),
        })
    }

    async fn card(
        &self,
        node: &dyn Node,
        query: &str,
        out: &ResultSet,
    ) -> Result<Option<ProductResult>, ScraperError> {
        let Some(url) = link_href(node, &self.base).await? else {
            return Ok(None);
        };
        if out.contains(&url) {
            return Ok(None);
        }

        let Some(raw_name) = first_name(node, NAME_CHAIN, 4).await? else {
            return Ok(None);
        };
        let name = clean_name(&raw_name, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::Bidirectional.is_relevant(&name, query) {
            return Ok(None);
        }

        let prices = extract_prices(&price_text(node, &[], PRICE_ANCESTORS).await?);
        let mut product = ProductResult::new(STORE.display_name(), name, url);
        product.price_original = prices.original;
        product.price_discount = prices.discount;
        product.image = image_src(node).await?;
        Ok(Some(product))
    }
}

#[async_trait]
impl SessionScrape for PrismaModaScraper {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let url = endpoint(&self.base, &format!("/{}", encode_query(query)));
        navigate_lenient(session, &url, self.ctx.options.navigation_timeout, STORE).await;
        session.pause(SETTLE).await;
        scroll_in_steps(session, SCROLL_STEPS, SCROLL_STEP_PX, SCROLL_PAUSE).await;
        if !session.wait_for(IMAGE_LINK, IMAGE_LINK_WAIT).await.unwrap_or(false) {
            tracing::debug!(store = %STORE, "no image links rendered");
        }

        let (nodes, tier) = locate_candidates(session, &CARDS).await;
        tracing::debug!(store = %STORE, ?tier, count = nodes.len(), "candidates located");

        let budget = self.ctx.options.max_items.saturating_mul(2);
        for (index, node) in nodes.iter().enumerate().take(budget) {
            if out.is_full() {
                break;
            }
            match self.card(node.as_ref(), query, out).await {
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
impl StoreScraper for PrismaModaScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        let results = run_in_session(&self.ctx, STORE, self, query).await;
        tracing::info!(store = %STORE, query, count = results.len(), "scrape finished");
        results
    }
}
