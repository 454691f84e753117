//! Vidrí hardware store.
//!
//! The VTEX catalogue API is tried first; when it answers with products the
//! page is never rendered. Otherwise the storefront is searched through its
//! hash-routed search URLs, then by typing into the search box, and as a
//! last resort category and promotion links are listed.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use cotiza_core::{ProductResult, Store};
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::{
    encode_query, endpoint, navigate_lenient, run_in_session, skip_candidate, ScrapeContext,
    SessionScrape, StoreScraper,
};
use crate::browser::{scroll_in_steps, Node, Session};
use crate::error::ScraperError;
use crate::extract::{image_src, resolve_href, ResultSet};
use crate::price::{compare_prices, find_price, split_was_now};
use crate::relevance::RelevancePolicy;
use crate::text::{clean_name, Boilerplate};

const BASE: &str = "https://www.vidri.com.sv";
const STORE: Store = Store::Vidri;

const API_PATH: &str = "/api/catalog_system/pub/products/search/?ft=";
const API_TIMEOUT: Duration = Duration::from_secs(10);

const SEARCH_PATTERNS: &[&str] = &["/#464e/fullscreen/m=and&q=", "/#q="];

const PRODUCT_SELECTORS: &[&str] = &[
    ".vtex-search-result-3-x-galleryItem",
    ".producto",
    ".producto-item",
    ".product-card",
    "div[class*='product-summary']",
    "article[class*='product']",
    "li[class*='product']",
    "div[id*='product']",
    "[data-product-id]",
    "[data-product]",
];

const TITLE_SELECTORS: &[&str] = &[
    ".vtex-product-summary-2-x-productBrand",
    ".vtex-product-summary-2-x-productName",
    ".title",
    ".name",
    ".nombre",
    ".product-name",
    "h2",
    "h3",
];

const SEARCH_INPUTS: &[&str] = &[
    "input[type='search']",
    "input[placeholder*='Buscar']",
    ".vtex-store-components-3-x-searchBarInnerContainer input",
    "form input[type='text']",
];

const CATEGORY_LINKS: &str = "a[href*='/catalogo/'],a[href*='/promocion/']";

/// Title-block lines that are labels, not part of the product name.
const EXCLUDED_PREFIXES: &[&str] = &[
    "Productos similares",
    "Válido hasta",
    "Antes:",
    "AGREGAR",
    "Modelo #",
    "Queda",
];

static STOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Queda\(n\)\s+(\d+)").expect("valid regex"));

const DOM_GROWTH_ATTEMPTS: u32 = 5;
const DOM_GROWTH_DELAY: Duration = Duration::from_millis(600);
const SCROLL_LIMIT_PX: u32 = 6000;
const SCROLL_STEP_PX: u32 = 800;
// Covers the whole limit, including the partial last step.
const SCROLL_STEPS: u32 = SCROLL_LIMIT_PX.div_ceil(SCROLL_STEP_PX);
const SCROLL_PAUSE: Duration = Duration::from_millis(120);

pub struct VidriScraper {
    ctx: ScrapeContext,
    base: Url,
    boilerplate: Boilerplate,
    include_categories: bool,
}

impl VidriScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn new(ctx: ScrapeContext) -> Result<Self, ScraperError> {
        Ok(Self {
            boilerplate: Boilerplate::new(&["Agregar", r"\$\d", "Agotado"]),
            include_categories: ctx.options.include_category_pages,
            base: ctx.base_url(BASE)?,
            ctx,
        })
    }

    async fn api_search(&self, session: &dyn Session, query: &str) -> Vec<ProductResult> {
        let url = endpoint(&self.base, &format!("{API_PATH}{}", encode_query(query)));
        match session.fetch_json(&url, API_TIMEOUT).await {
            Ok(body) => products_from_api(body, &self.base),
            Err(e) => {
                tracing::debug!(store = %STORE, url, error = %e, "catalogue API unavailable");
                Vec::new()
            }
        }
    }

    async fn collect_nodes(&self, session: &dyn Session, query: &str, out: &mut ResultSet) {
        let mut nodes = Vec::new();
        for selector in PRODUCT_SELECTORS {
            match session.query(selector).await {
                Ok(found) => nodes.extend(found),
                Err(e) => tracing::debug!(store = %STORE, selector, error = %e, "selector failed"),
            }
        }
        if nodes.is_empty() {
            nodes = session.query("a[href]").await.unwrap_or_default();
        }
        tracing::debug!(store = %STORE, count = nodes.len(), "product blocks found");

        for (index, node) in nodes.iter().enumerate() {
            if out.is_full() {
                break;
            }
            match self.product_block(node.as_ref(), query).await {
                Ok(Some(product)) => {
                    out.push(product);
                }
                Ok(None) => {}
                Err(e) => skip_candidate(STORE, index, &e),
            }
        }
    }

    async fn product_block(
        &self,
        node: &dyn Node,
        query: &str,
    ) -> Result<Option<ProductResult>, ScraperError> {
        let block = block_title(node).await?;
        let Some(title) = block.title else {
            return Ok(None);
        };

        let prices = split_was_now(&node.text().await?);

        let raw_href = match node.query("a[href]").await?.into_iter().next() {
            Some(link) => link.attribute("href").await?,
            None => node.attribute("href").await?,
        };
        let Some(raw_href) = raw_href else {
            return Ok(None);
        };
        let Some(url) = resolve_href(&self.base, &raw_href) else {
            return Ok(None);
        };

        if !is_plausible_product(&raw_href, &title, !prices.is_empty(), query, self.include_categories) {
            return Ok(None);
        }

        let name = clean_name(&title, &self.boilerplate);
        if name.is_empty() || !RelevancePolicy::AnyWord.is_relevant(&name, query) {
            return Ok(None);
        }

        tracing::trace!(
            store = %STORE,
            url,
            model = ?block.model,
            brand = ?block.brand,
            stock = ?block.stock,
            "product block"
        );

        let mut product = ProductResult::new(STORE.display_name(), name, url);
        product.price_original = prices.original;
        product.price_discount = prices.discount;
        product.image = image_src(node).await?;
        Ok(Some(product))
    }

    /// Types the query into the first usable search box.
    async fn manual_search(&self, session: &dyn Session, query: &str) -> bool {
        for selector in SEARCH_INPUTS {
            let Ok(inputs) = session.query(selector).await else {
                continue;
            };
            let Some(input) = inputs.first() else {
                continue;
            };
            match input.type_and_submit(query).await {
                Ok(()) => return true,
                Err(e) => tracing::debug!(store = %STORE, selector, error = %e, "search input unusable"),
            }
        }
        false
    }

    async fn category_scan(&self, session: &dyn Session, out: &mut ResultSet) {
        let links = match session.query(CATEGORY_LINKS).await {
            Ok(links) => links,
            Err(e) => {
                tracing::debug!(store = %STORE, error = %e, "category scan failed");
                return;
            }
        };
        for (index, link) in links.iter().enumerate() {
            if out.is_full() {
                break;
            }
            match self.category_link(link.as_ref()).await {
                Ok(Some(product)) => {
                    out.push(product);
                }
                Ok(None) => {}
                Err(e) => skip_candidate(STORE, index, &e),
            }
        }
    }

    async fn category_link(&self, link: &dyn Node) -> Result<Option<ProductResult>, ScraperError> {
        let Some(url) = link
            .attribute("href")
            .await?
            .and_then(|href| resolve_href(&self.base, &href))
        else {
            return Ok(None);
        };
        let title = clean_name(&link.text().await?, &self.boilerplate);
        if title.is_empty() {
            return Ok(None);
        }
        Ok(Some(ProductResult::new(STORE.display_name(), title, url)))
    }

    /// Lets the page render and lazy content load before extraction.
    async fn let_page_grow(&self, session: &dyn Session) {
        wait_dom_growth(session).await;
        scroll_in_steps(session, SCROLL_STEPS, SCROLL_STEP_PX, SCROLL_PAUSE).await;
    }
}

/// Polls the element count until it stops growing.
async fn wait_dom_growth(session: &dyn Session) {
    let mut previous = 0;
    for _ in 0..DOM_GROWTH_ATTEMPTS {
        match session
            .evaluate("document.getElementsByTagName('*').length")
            .await
        {
            Ok(value) => {
                let count = value.as_u64().unwrap_or(0);
                if count > 0 && count <= previous {
                    return;
                }
                previous = count;
            }
            Err(e) => {
                tracing::debug!(store = %STORE, error = %e, "cannot measure page growth");
                return;
            }
        }
        session.pause(DOM_GROWTH_DELAY).await;
    }
}

#[async_trait]
impl SessionScrape for VidriScraper {
    async fn collect(
        &self,
        session: &mut dyn Session,
        query: &str,
        out: &mut ResultSet,
    ) -> Result<(), ScraperError> {
        let from_api = self.api_search(session, query).await;
        if !from_api.is_empty() {
            tracing::debug!(store = %STORE, count = from_api.len(), "using catalogue API");
            for product in from_api {
                out.push(product);
            }
            return Ok(());
        }

        let timeout = self.ctx.options.navigation_timeout;
        for pattern in SEARCH_PATTERNS {
            let url = endpoint(&self.base, &format!("{pattern}{}", encode_query(query)));
            navigate_lenient(session, &url, timeout, STORE).await;
            self.let_page_grow(session).await;
            self.collect_nodes(session, query, out).await;
            if !out.is_empty() {
                return Ok(());
            }
        }

        navigate_lenient(session, self.base.as_str(), timeout, STORE).await;
        if self.manual_search(session, query).await {
            self.let_page_grow(session).await;
            self.collect_nodes(session, query, out).await;
            if !out.is_empty() {
                return Ok(());
            }
        }

        tracing::debug!(store = %STORE, query, "falling back to category links");
        self.category_scan(session, out).await;
        Ok(())
    }
}

#[async_trait]
impl StoreScraper for VidriScraper {
    fn store(&self) -> Store {
        STORE
    }

    async fn scrape(&self, query: &str) -> Vec<ProductResult> {
        let results = run_in_session(&self.ctx, STORE, self, query).await;
        tracing::info!(store = %STORE, query, count = results.len(), "scrape finished");
        results
    }
}

// ---------------------------------------------------------------------------
// Catalogue API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    product_title: Option<String>,
    #[serde(default)]
    link_text: Option<String>,
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    sellers: Vec<ApiSeller>,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiSeller {
    #[serde(rename = "commertialOffer", default)]
    offer: Option<ApiOffer>,
}

#[derive(Debug, Deserialize)]
struct ApiOffer {
    #[serde(rename = "Price", default)]
    price: Option<serde_json::Number>,
    #[serde(rename = "ListPrice", default)]
    list_price: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    #[serde(rename = "imageUrl", default)]
    image_url: Option<String>,
}

/// Maps a catalogue search response to results. Anything other than a JSON
/// array of products yields nothing.
fn products_from_api(body: serde_json::Value, base: &Url) -> Vec<ProductResult> {
    let products: Vec<ApiProduct> = match serde_json::from_value(body) {
        Ok(products) => products,
        Err(e) => {
            tracing::debug!(store = %STORE, error = %e, "unexpected catalogue response");
            return Vec::new();
        }
    };

    products
        .into_iter()
        .filter_map(|p| {
            let name = p
                .product_name
                .or(p.product_title)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())?;
            let url = match p.link_text.as_deref().map(str::trim) {
                Some(link) if !link.is_empty() => endpoint(base, &format!("/{link}/p")),
                _ => base.to_string(),
            };

            let first_item = p.items.first();
            let offer = first_item
                .and_then(|item| item.sellers.first())
                .and_then(|seller| seller.offer.as_ref());

            let mut product = ProductResult::new(STORE.display_name(), name, url);
            if let Some(price) = offer.and_then(|o| money(o.price.as_ref())) {
                match offer.and_then(|o| money(o.list_price.as_ref())) {
                    Some(list) if compare_prices(&list, &price) > 0 => {
                        product.price_original = list;
                        product.price_discount = price;
                    }
                    _ => product.price_original = price,
                }
            }
            product.image = first_item
                .and_then(|item| item.images.first())
                .and_then(|img| img.image_url.clone())
                .unwrap_or_default();
            Some(product)
        })
        .collect()
}

/// `$`-prefixed price as the API printed it; zero means no offer.
fn money(amount: Option<&serde_json::Number>) -> Option<String> {
    let amount = amount?;
    if amount.as_f64().is_some_and(|v| v > 0.0) {
        Some(format!("${amount}"))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// DOM product blocks
// ---------------------------------------------------------------------------

/// A product block split into its title and the labelled details printed
/// around it.
#[derive(Debug, Default, PartialEq, Eq)]
struct TitleBlock {
    title: Option<String>,
    model: Option<String>,
    brand: Option<String>,
    stock: Option<String>,
}

fn is_upper_label(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

fn is_all_digits(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

fn refine_block(raw: &str) -> TitleBlock {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let model = lines
        .iter()
        .filter(|l| l.to_lowercase().starts_with("modelo #"))
        .filter_map(|l| l.split_once('#').map(|(_, rest)| rest.trim().to_string()))
        .last()
        .filter(|m| !m.is_empty());

    let stock = lines
        .iter()
        .filter_map(|l| STOCK_RE.captures(l).map(|c| c[1].to_string()))
        .last();

    let brand = lines
        .iter()
        .filter(|l| {
            is_upper_label(l)
                && l.split_whitespace().count() <= 3
                && **l != "AGREGAR"
                && !l.starts_with("MODELO")
        })
        .map(|l| (*l).to_string())
        .last();

    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| !EXCLUDED_PREFIXES.iter().any(|p| l.starts_with(p)))
        .filter(|l| !is_all_digits(l))
        .filter(|l| find_price(l).is_none())
        .filter(|l| brand.as_deref() != Some(*l))
        .filter(|l| model.as_deref().is_none_or(|m| !l.contains(m)))
        .collect();

    // With several survivors the name is the last one; earlier lines are
    // category or promo labels.
    let title = match kept.as_slice() {
        [] => None,
        [only] => Some((*only).to_string()),
        [.., last] => Some((*last).to_string()),
    };

    TitleBlock {
        title,
        model,
        brand,
        stock,
    }
}

/// Title block of a product node: the first title selector that yields a
/// title, else the first link's text, else the whole node.
async fn block_title(node: &dyn Node) -> Result<TitleBlock, ScraperError> {
    for selector in TITLE_SELECTORS {
        if let Some(found) = node.query(selector).await?.first() {
            let block = refine_block(&found.text().await?);
            if block.title.is_some() {
                return Ok(block);
            }
        }
    }
    if let Some(link) = node.query("a[href]").await?.first() {
        let block = refine_block(&link.text().await?);
        if block.title.is_some() {
            return Ok(block);
        }
    }
    Ok(refine_block(&node.text().await?))
}

/// Whether a DOM block plausibly describes a product: it shows a price, its
/// title mentions the query, or it links to a product page. Category and
/// promotion pages only count when enabled.
fn is_plausible_product(
    href: &str,
    title: &str,
    has_price: bool,
    query: &str,
    include_categories: bool,
) -> bool {
    let href = href.to_lowercase();
    has_price
        || title.to_lowercase().contains(&query.trim().to_lowercase())
        || href.contains("/p")
        || href.contains("/producto")
        || (include_categories && (href.contains("/catalogo/") || href.contains("/promocion/")))
}

#[cfg(test)]
#[path = "vidri_test.rs"]
mod tests;
