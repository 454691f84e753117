//! Name cleaning and comparison keys.

use regex::{Regex, RegexBuilder};

/// Longest product name emitted, in characters.
pub const MAX_NAME_CHARS: usize = 200;

/// Per-store denylist of lines that are storefront chrome rather than part
/// of a product title (cart buttons, seller attribution, inline prices).
#[derive(Debug, Clone)]
pub struct Boilerplate {
    patterns: Vec<Regex>,
}

impl Boilerplate {
    /// Builds a case-insensitive denylist.
    ///
    /// # Panics
    ///
    /// Panics if a pattern is not a valid regex. Patterns are compile-time
    /// constants in this crate.
    #[must_use]
    pub fn new(patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .expect("valid regex")
            })
            .collect();
        Self { patterns }
    }

    /// `true` when a line matches any denylisted pattern.
    #[must_use]
    pub fn rejects(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }
}

/// Turns a multi-line text block into a single-line product name.
///
/// Lines matching `boilerplate` are dropped, surviving lines are trimmed and
/// joined with one space, inner whitespace runs are collapsed, and the
/// result is cut at [`MAX_NAME_CHARS`] characters.
///
/// The denylist is checked again on the final, truncated name: a marker
/// formed by joining two lines, or by the cut itself, yields an empty name.
/// This keeps `clean_name` idempotent.
#[must_use]
pub fn clean_name(raw: &str, boilerplate: &Boilerplate) -> String {
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !boilerplate.rejects(line))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let name = truncate_chars(&joined, MAX_NAME_CHARS);
    if boilerplate.rejects(&name) {
        return String::new();
    }
    name
}

/// Cuts `s` to at most `max` characters on a char boundary, then trims any
/// trailing whitespace the cut exposed.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Comparison key for matching the same product across branches.
///
/// Lowercases, drops every character that is neither alphanumeric nor
/// whitespace, and collapses whitespace. Accented letters are kept.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First line of `text` longer than `min_chars` characters, trimmed.
#[must_use]
pub fn first_substantial_line(text: &str, min_chars: usize) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| line.chars().count() > min_chars)
}

#[cfg(test)]
#[path = "text_test.rs"]
mod tests;
