use serde::{Deserialize, Serialize};

/// One product listing scraped from a storefront search page.
///
/// Prices are kept as the raw currency strings shown by the store
/// (`"$1,299.00"`); an empty string means the price was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResult {
    /// Retailer display name, e.g. `"Simán"`.
    pub store: String,
    /// Cleaned single-line title, at most 200 characters.
    pub name: String,
    pub price_original: String,
    /// Only set when a second, distinct price token was found.
    pub price_discount: String,
    /// Absolute product page URL. Unique within one store scrape.
    pub url: String,
    pub image: String,
    /// Cross-branch availability, present only on consolidated results.
    /// `None` adds no keys to the serialized object.
    #[serde(flatten)]
    pub availability: Option<BranchAvailability>,
}

impl ProductResult {
    #[must_use]
    pub fn new(store: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            name: name.into(),
            price_original: String::new(),
            price_discount: String::new(),
            url: url.into(),
            image: String::new(),
            availability: None,
        }
    }

    #[must_use]
    pub fn has_price(&self) -> bool {
        !self.price_original.is_empty() || !self.price_discount.is_empty()
    }
}

/// Branch coverage of a product merged across a multi-branch retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchAvailability {
    /// Branch display names, in first-seen order, without duplicates.
    pub available_stores: Vec<String>,
    /// Branch that offered the lowest discounted price observed.
    pub best_price_store: String,
    pub stores_count: usize,
}
