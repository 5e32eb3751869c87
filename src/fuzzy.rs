//! Approximate string matching for candidate narrowing.
//!
//! Wraps the fuzzy matching implementation so the rest of the pipeline works
//! against a small ranking interface rather than a concrete matcher.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// A matcher for ranking candidate names against a query.
pub struct Matcher {
    inner: SkimMatcherV2,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            inner: SkimMatcherV2::default(),
        }
    }

    /// Get the match score for ranking results.
    ///
    /// Returns `Some(score)` if the query matches, where higher scores
    /// indicate better matches. Matching is case-insensitive.
    pub fn score(&self, text: &str, query: &str) -> Option<i64> {
        self.inner.fuzzy_match(text, &query.to_lowercase())
    }

    /// Returns the candidates that match `query`, best first.
    ///
    /// Candidates below the matcher's similarity floor are dropped entirely;
    /// ties keep their input order.
    pub fn rank<'a>(&self, query: &str, candidates: &'a [String]) -> Vec<&'a str> {
        let mut scored: Vec<(i64, &str)> = candidates
            .iter()
            .filter_map(|c| self.score(c, query).map(|s| (s, c.as_str())))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, c)| c).collect()
    }

    /// Orders every candidate by similarity to `query`, matches first.
    ///
    /// Unlike [`rank`](Self::rank), nothing is dropped: candidates with no
    /// match at all sink to the end in their input order. Used for surfacing
    /// host-like environment variables while keeping the full list pickable.
    pub fn order_all<'a>(&self, query: &str, candidates: &'a [String]) -> Vec<&'a str> {
        let mut scored: Vec<(i64, usize, &str)> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (self.score(c, query).unwrap_or(i64::MIN), i, c.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, _, c)| c).collect()
    }
}
