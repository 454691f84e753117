//! Candidate discovery and per-field extraction shared by the store
//! scrapers.

mod cascade;
mod fields;

use std::collections::HashSet;

use cotiza_core::ProductResult;

pub use cascade::{locate_candidates, Cascade, CascadeTier};
pub use fields::{first_name, image_src, link_href, price_text, resolve_href, NameSource};

/// Results of one store scrape, deduplicated by URL and capped.
#[derive(Debug)]
pub struct ResultSet {
    items: Vec<ProductResult>,
    seen: HashSet<String>,
    max_items: usize,
}

impl ResultSet {
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            max_items,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_items
    }

    /// `true` if `url` was already emitted in this scrape.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Appends `result` unless its URL was already emitted or the set is
    /// full. Returns whether it was kept.
    pub fn push(&mut self, result: ProductResult) -> bool {
        if self.is_full() || !self.seen.insert(result.url.clone()) {
            return false;
        }
        self.items.push(result);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ProductResult> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(url: &str) -> ProductResult {
        ProductResult::new("Simán", "Licuadora", url)
    }

    #[test]
    fn push_skips_repeated_urls() {
        let mut set = ResultSet::new(10);
        assert!(set.push(product("https://a.test/1")));
        assert!(!set.push(product("https://a.test/1")));
        assert!(set.push(product("https://a.test/2")));
        assert_eq!(set.len(), 2);
        assert!(set.contains("https://a.test/1"));
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut set = ResultSet::new(2);
        assert!(set.push(product("https://a.test/1")));
        assert!(set.push(product("https://a.test/2")));
        assert!(set.is_full());
        assert!(!set.push(product("https://a.test/3")));
        assert!(!set.contains("https://a.test/3"));

        let urls: Vec<String> = set.into_vec().into_iter().map(|p| p.url).collect();
        assert_eq!(urls, ["https://a.test/1", "https://a.test/2"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut set = ResultSet::new(0);
        assert!(set.is_full());
        assert!(!set.push(product("https://a.test/1")));
        assert!(set.is_empty());
    }
}
