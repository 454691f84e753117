//! Query-to-name relevance policies.

/// Rule deciding whether a scraped name answers the user's query.
///
/// The query is split on whitespace into lowercase words; matching is by
/// substring against the lowercased name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevancePolicy {
    /// At least one query word appears in the name.
    AnyWord,
    /// Every query word appears in the name.
    AllWords,
    /// At least `max(1, ceil(words / 2))` query words appear in the name.
    Majority,
    /// A query word appears in the name, or the whole name appears inside a
    /// query word. Tolerates very short names.
    Bidirectional,
}

impl RelevancePolicy {
    #[must_use]
    pub fn is_relevant(self, name: &str, query: &str) -> bool {
        let name = name.to_lowercase();
        let query = query.to_lowercase();
        let words: Vec<&str> = query.split_whitespace().collect();

        match self {
            RelevancePolicy::AnyWord => words.iter().any(|w| name.contains(w)),
            RelevancePolicy::AllWords => words.iter().all(|w| name.contains(w)),
            RelevancePolicy::Majority => {
                let hits = words.iter().filter(|w| name.contains(*w)).count();
                hits >= words.len().div_ceil(2).max(1)
            }
            RelevancePolicy::Bidirectional => {
                let name = name.trim();
                words
                    .iter()
                    .any(|w| name.contains(w) || (!name.is_empty() && w.contains(name)))
            }
        }
    }
}
