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

const BASE: &str = "https://www.superselectos.com";
const STORE: Store = Store::Selectos;

const CARDS: Cascade = Cascade {
    primary: &["li.item-producto"],
    min_count: 1,
    link_fallback: false,
};

const NAME_CHAIN: &[NameSource] = &[NameSource::Selector("h5.prod-nombre a")];

const CONTENT_WAIT: Duration = Duration::from_secs(20);
const SETTLE: Duration = Duration::from_secs(5);

/// Super Selectos grocery catalogue.
pub struct SelectosScraper {
    ctx: ScrapeContext,
    base: Url,
    boilerplate: Boilerplate,
}

impl SelectosScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext) -> Result<Self, ScraperError> {
        Ok(Self {
            base: ctx.base_url(BASE)?,
            ctx,
            boilerplate: Boilerplate::new(&["Agregar al carrito", r"\$\d"]),
        })
    }

    async fn card(&self, node: &dyn Node, query: &str) -> Result<Option<ProductResult>, ScraperError> {
        let raw_name = first_name(node, NAME_CHAIN, 0).await?.unwrap_or_default();
        let name = clean_name(&raw_name, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::Majority.is_relevant(&name, query) {
            return Ok(None);
        }
        let Some(url) = link_href(node, &self.base).await? else {
            return Ok(None);
        };

        let prices = extract_prices(&price_text(node, &["[class*='price']"], 0).await?);
        let mut product = ProductResult::new(STORE.display_name(), name, url);
        product.price_original = prices.original;
        product.price_discount = prices.discount;
        product.image = image_src(node).await?;
        Ok(Some(product))
    }
}

#[async_trait]
impl SessionScrape for SelectosScraper {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let url = endpoint(&self.base, &format!("/products?keyword={}", encode_query(query)));
        navigate_lenient(session, &url, self.ctx.options.navigation_timeout, STORE).await;
        settle(session, CARDS.primary[0], CONTENT_WAIT, SETTLE).await;

        let (nodes, _) = locate_candidates(session, &CARDS).await;
        tracing::debug!(store = %STORE, count = nodes.len(), "product tiles found");

        for (index, node) in nodes.iter().enumerate() {
            if out.is_full() {
                break;
            }
            match self.card(node.as_ref(), query).await {
                Ok(Some(product)) => {
                    out.push(product);
                }
                Ok(None) => tracing::trace!(store = %STORE, index, "tile discarded"),
                Err(e) => skip_candidate(STORE, index, &e),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreScraper for SelectosScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        let results = run_in_session(&self.ctx, STORE, self, query).await;
        tracing::info!(store = %STORE, query, count = results.len(), "scrape finished");
        results
    }
}
