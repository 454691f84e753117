//! Merges per-branch results of a multi-branch retailer into one list.

use std::cmp::Reverse;
use std::collections::HashMap;

use cotiza_core::{BranchAvailability, ProductResult};

use crate::price::compare_prices;
use crate::text::normalize_key;

/// Accumulates branch scrapes in order and merges listings that share a
/// normalized name.
#[derive(Debug, Default)]
pub struct Consolidator {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

#[derive(Debug)]
struct Record {
    product: ProductResult,
    branches: Vec<String>,
    best_price_branch: String,
}

impl Consolidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one branch's results into the accumulator.
    ///
    /// A new key creates a record owned by `branch`. A known key gains
    /// `branch` (once) and takes over the discounted price when it is lower
    /// than, or fills in, the recorded one. The first-seen original price is
    /// kept.
    pub fn absorb(&mut self, branch: &str, results: Vec<ProductResult>) {
        for product in results {
            let key = normalize_key(&product.name);
            match self.index.get(&key) {
                Some(&idx) => self.records[idx].merge(branch, product),
                None => {
                    self.index.insert(key, self.records.len());
                    self.records.push(Record {
                        product,
                        branches: vec![branch.to_string()],
                        best_price_branch: branch.to_string(),
                    });
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attaches branch availability to every record and orders them by
    /// branch count, most first. Equal counts keep discovery order.
    #[must_use]
    pub fn finish(self) -> Vec<ProductResult> {
        let mut out: Vec<ProductResult> = self
            .records
            .into_iter()
            .map(|record| {
                let mut product = record.product;
                product.availability = Some(BranchAvailability {
                    stores_count: record.branches.len(),
                    available_stores: record.branches,
                    best_price_store: record.best_price_branch,
                });
                product
            })
            .collect();
        out.sort_by_key(|p| {
            Reverse(p.availability.as_ref().map_or(0, |a| a.stores_count))
        });
        out
    }
}

impl Record {
    fn merge(&mut self, branch: &str, observed: ProductResult) {
        if !self.branches.iter().any(|b| b == branch) {
            self.branches.push(branch.to_string());
        }

        if observed.price_discount.is_empty() {
            return;
        }
        let current = &self.product.price_discount;
        if current.is_empty() || compare_prices(&observed.price_discount, current) < 0 {
            self.product.price_discount = observed.price_discount;
            self.best_price_branch = branch.to_string();
        }
    }
}
