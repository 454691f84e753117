use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{ProductResult, Store};
use url::Url;

use super::{
    encode_query, endpoint, navigate_lenient, run_in_session, settle, skip_candidate,
    ScrapeContext, SessionScrape, StoreScraper,
};
use crate::browser::{Node, Session};
use crate::error::ScraperError;
use crate::extract::{
    first_name, image_src, link_href, locate_candidates, price_text, Cascade, NameSource,
    ResultSet,
};
use crate::price::extract_prices;
use crate::relevance::RelevancePolicy;
use crate::text::{clean_name, Boilerplate};

const BASE: &str = "https://sv.siman.com";
const STORE: Store = Store::Siman;

const CARDS: Cascade = Cascade {
    primary: &[
        ".ais-Hits-list .ais-Hits-item",
        ".ais-Hits-item, .vtex-search-result-3-x-resultItem",
    ],
    min_count: 1,
    link_fallback: false,
};

const NAME_CHAIN: &[NameSource] = &[
    NameSource::Selector(
        "[class*='Name'], [class*='name'], [class*='searchProductsItemName'], h2, h3, a",
    ),
    NameSource::Selector("a"),
    NameSource::ImageAlt,
    NameSource::Attribute("aria-label"),
    NameSource::FirstLine,
];

const PRICE_SELECTORS: &[&str] =
    &["[class*='Price'], [class*='price'], [class*='searchProductsItemPrice']"];

const CONTENT_READY: &str = ".ais-Hits-item";
const CONTENT_WAIT: Duration = Duration::from_secs(20);
const SETTLE_FALLBACK: Duration = Duration::from_secs(3);

/// Simán's Algolia-backed search page.
pub struct SimanScraper {
    ctx: ScrapeContext,
    base: Url,
    boilerplate: Boilerplate,
}

impl SimanScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext) -> Result<Self, ScraperError> {
        Ok(Self {
            base: ctx.base_url(BASE)?,
            ctx,
            boilerplate: Boilerplate::new(&["Vendido por", "Agregar al carrito", r"\$\d"]),
        })
    }

    async fn card(&self, node: &dyn Node, query: &str) -> Result<Option<ProductResult>, ScraperError> {
        let Some(url) = link_href(node, &self.base).await? else {
            return Ok(None);
        };
        let Some(raw_name) = first_name(node, NAME_CHAIN, 3).await? else {
            return Ok(None);
        };
        let name = clean_name(&raw_name, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::AllWords.is_relevant(&name, query) {
            return Ok(None);
        }

        let prices = extract_prices(&price_text(node, PRICE_SELECTORS, 0).await?);
        let mut product = ProductResult::new(STORE.display_name(), name, url);
        product.price_original = prices.original;
        product.price_discount = prices.discount;
        product.image = image_src(node).await?;
        Ok(Some(product))
    }
}

#[async_trait]
impl SessionScrape for SimanScraper {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let url = endpoint(&self.base, &format!("/search?_q={}", encode_query(query)));
        navigate_lenient(session, &url, self.ctx.options.navigation_timeout, STORE).await;
        settle(session, CONTENT_READY, CONTENT_WAIT, SETTLE_FALLBACK).await;

        let (nodes, tier) = locate_candidates(session, &CARDS).await;
        tracing::debug!(store = %STORE, ?tier, count = nodes.len(), "candidates located");

        for (index, node) in nodes.iter().enumerate() {
            if out.is_full() {
                break;
            }
            match self.card(node.as_ref(), query).await {
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
impl StoreScraper for SimanScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        let results = run_in_session(&self.ctx, STORE, self, query).await;
        tracing::info!(store = %STORE, query, count = results.len(), "scrape finished");
        results
    }
}
