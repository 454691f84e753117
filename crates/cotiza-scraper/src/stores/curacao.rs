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
use crate::extract::{first_name, image_src, price_text, resolve_href, NameSource, ResultSet};
use crate::price::extract_prices;
use crate::relevance::RelevancePolicy;
use crate::text::{clean_name, Boilerplate};

const BASE: &str = "https://www.lacuracaonline.com";
const STORE: Store = Store::Curacao;

const PRODUCT_LINK: &str = "a[href*='/p']";
/// Upper bound on product-bearing containers kept from the page scan.
const MAX_CONTAINERS: usize = 50;
/// Container text that marks page chrome (filters, sorting) rather than a
/// product tile.
const NAVIGATION_MARKERS: &[&str] = &["resultados de búsqueda", "filtrar por", "ordenar por"];

const NAME_CHAIN: &[NameSource] = &[
    NameSource::Selector(".vtex-product-summary-2-x-nameContainer"),
    NameSource::Selector("[class*='nameContainer']"),
    NameSource::Selector("h3"),
    NameSource::Selector("h2"),
    NameSource::Selector(PRODUCT_LINK),
];

const PRICE_SELECTORS: &[&str] = &[
    ".vtex-product-price-1-x-sellingPrice",
    "[class*='sellingPrice']",
    "[class*='price']",
];

const SETTLE: Duration = Duration::from_secs(5);
const SCROLL_STEPS: u32 = 5;
const SCROLL_STEP_PX: u32 = 400;
const SCROLL_PAUSE: Duration = Duration::from_millis(400);
const GALLERY: &str = ".vtex-search-result-3-x-gallery";
const GALLERY_WAIT: Duration = Duration::from_secs(10);

/// La Curacao's VTEX storefront. The product grid has no stable card class,
/// so candidates are any container holding both a product link and an
/// image.
pub struct CuracaoScraper {
    ctx: ScrapeContext,
    base: Url,
    boilerplate: Boilerplate,
}

impl CuracaoScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext) -> Result<Self, ScraperError> {
        Ok(Self {
            base: ctx.base_url(BASE)?,
            ctx,
            boilerplate: Boilerplate::new(&[
                "Vendido por",
                "Agregar al carrito",
                "Agregar",
                "Añadir",
                r"\$\d",
            ]),
        })
    }

    async fn containers(&self, session: &dyn Session) -> Vec<Box<dyn Node>> {
        let divs = match session.query("div").await {
            Ok(divs) => divs,
            Err(e) => {
                tracing::debug!(store = %STORE, error = %e, "container scan failed");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for div in divs {
            if out.len() >= MAX_CONTAINERS {
                break;
            }
            let has_link = div.query(PRODUCT_LINK).await.is_ok_and(|v| !v.is_empty());
            let has_image = has_link && div.query("img").await.is_ok_and(|v| !v.is_empty());
            if has_image {
                out.push(div);
            }
        }
        out
    }

    async fn card(
        &self,
        node: &dyn Node,
        query: &str,
        out: &ResultSet,
    ) -> Result<Option<ProductResult>, ScraperError> {
        let text = node.text().await?;
        let lowered = text.to_lowercase();
        if NAVIGATION_MARKERS.iter().any(|m| lowered.contains(m)) {
            return Ok(None);
        }

        let Some(link) = node.query(PRODUCT_LINK).await?.into_iter().next() else {
            return Ok(None);
        };
        let Some(url) = link
            .attribute("href")
            .await?
            .and_then(|href| resolve_href(&self.base, &href))
        else {
            return Ok(None);
        };
        if out.contains(&url) {
            return Ok(None);
        }

        let Some(raw_name) = first_name(node, NAME_CHAIN, 5).await? else {
            return Ok(None);
        };
        let name = clean_name(&raw_name, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::AnyWord.is_relevant(&name, query) {
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
impl SessionScrape for CuracaoScraper {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let url = endpoint(&self.base, &format!("/elsalvador/{}", encode_query(query)));
        navigate_lenient(session, &url, self.ctx.options.navigation_timeout, STORE).await;
        session.pause(SETTLE).await;
        scroll_in_steps(session, SCROLL_STEPS, SCROLL_STEP_PX, SCROLL_PAUSE).await;
        if !session.wait_for(GALLERY, GALLERY_WAIT).await.unwrap_or(false) {
            tracing::debug!(store = %STORE, "gallery never appeared");
        }

        let containers = self.containers(session).await;
        tracing::debug!(store = %STORE, count = containers.len(), "product containers found");

        // Filtering drops many containers, so look at twice the cap.
        let budget = self.ctx.options.max_items.saturating_mul(2);
        for (index, node) in containers.iter().enumerate().take(budget) {
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
impl StoreScraper for CuracaoScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        let results = run_in_session(&self.ctx, STORE, self, query).await;
        tracing::info!(store = %STORE, query, count = results.len(), "scrape finished");
        results
    }
}
