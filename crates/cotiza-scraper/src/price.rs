//! Currency token extraction and numeric price comparison.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s?\d[\d,.]*").expect("valid regex"));
static WAS_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)antes:\s*(\$\s?\d[\d,.]*)").expect("valid regex"));

/// Raw price strings found in a block of text. Empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prices {
    pub original: String,
    pub discount: String,
}

impl Prices {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty() && self.discount.is_empty()
    }
}

/// Every `$`-led token in `text`, in order, including repeats.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    PRICE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',']))
}

/// First currency token in `text`, e.g. `"$1,299.00"`.
#[must_use]
pub fn find_price(text: &str) -> Option<&str> {
    tokens(text).next()
}

/// Distinct currency tokens in first-seen order.
#[must_use]
pub fn unique_prices(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in tokens(text) {
        if !out.iter().any(|seen| seen == token) {
            out.push(token.to_string());
        }
    }
    out
}

/// Splits a text block into original and discounted price.
///
/// The first token is the original price; the next token that differs from
/// it is the discount. Without any token both fields are empty.
#[must_use]
pub fn extract_prices(text: &str) -> Prices {
    let mut unique = unique_prices(text).into_iter();
    Prices {
        original: unique.next().unwrap_or_default(),
        discount: unique.next().unwrap_or_default(),
    }
}

/// Like [`extract_prices`], but honours an explicit `Antes: $X` marker.
///
/// When the marker is present its token is the original price and the first
/// other token is the current (discounted) price. Otherwise the first token
/// is the only price and is reported as original.
#[must_use]
pub fn split_was_now(text: &str) -> Prices {
    let was = WAS_PRICE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']));

    match was {
        Some(was) => Prices {
            original: was.to_string(),
            discount: tokens(text)
                .find(|t| *t != was)
                .unwrap_or_default()
                .to_string(),
        },
        None => Prices {
            original: find_price(text).unwrap_or_default().to_string(),
            discount: String::new(),
        },
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// Numeric comparison of two raw price strings.
///
/// Returns `-1`, `0` or `1` like `a.cmp(b)`. Currency symbols, grouping
/// commas and spaces are ignored. If either side does not parse the prices
/// are incomparable and `0` is returned.
#[must_use]
pub fn compare_prices(a: &str, b: &str) -> i8 {
    match (parse_amount(a), parse_amount(b)) {
        (Some(a), Some(b)) => match a.cmp(&b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        },
        _ => 0,
    }
}
