//! Entity name resolution for the classifier.
//!
//! Exact (normalized) matching runs first and is authoritative; fuzzy
//! matching only proposes candidates for tokens that look like entity
//! references but resolve to nothing.

use crate::models::Target;
use crate::store::{normalize_name, DataStore};
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};

/// A scored entity candidate. `score` is normalized to 0..=1 against
/// the pattern's self-match, so 1.0 means a perfect hit.
#[derive(Debug, Clone)]
pub struct EntityMatch {
    pub target: Target,
    pub name: String,
    pub score: f32,
}

/// Index of all known sector and PSU names.
pub struct EntityIndex {
    names: Vec<IndexedName>,
    matcher: Matcher,
}

struct IndexedName {
    normalized: String,
    display: String,
    target: Target,
}

impl EntityIndex {
    pub fn new(store: &DataStore) -> Self {
        let mut names = Vec::new();
        for sector in store.sectors().values() {
            names.push(IndexedName {
                normalized: normalize_name(&sector.name),
                display: sector.name.clone(),
                target: Target::Sector(sector.id),
            });
        }
        for psu in store.psus().values() {
            names.push(IndexedName {
                normalized: normalize_name(&psu.name),
                display: psu.name.clone(),
                target: Target::Psu(psu.id),
            });
        }

        Self {
            names,
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// All known names appearing verbatim (word-aligned) in the
    /// normalized query. Catches multi-word names token scanning misses.
    pub fn exact_matches(&self, normalized_query: &str) -> Vec<EntityMatch> {
        let padded = format!(" {} ", normalized_query);
        self.names
            .iter()
            .filter(|entry| padded.contains(&format!(" {} ", entry.normalized)))
            .map(|entry| EntityMatch {
                target: entry.target,
                name: entry.display.clone(),
                score: 1.0,
            })
            .collect()
    }

    /// Fuzzy candidates for one token, best first. Scores are the raw
    /// nucleo score divided by the token's self-match score, capped at
    /// 1.0, so thresholds are independent of token length.
    pub fn fuzzy_matches(&mut self, token: &str, limit: usize) -> Vec<EntityMatch> {
        let pattern = Pattern::parse(token, CaseMatching::Ignore, Normalization::Smart);

        let self_haystack = Utf32String::from(token);
        let self_score = pattern
            .score(self_haystack.slice(..), &mut self.matcher)
            .unwrap_or(0) as f32;
        if self_score == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<EntityMatch> = self
            .names
            .iter()
            .filter_map(|entry| {
                let haystack = Utf32String::from(entry.normalized.as_str());
                let score = pattern.score(haystack.slice(..), &mut self.matcher)? as f32;
                Some(EntityMatch {
                    target: entry.target,
                    name: entry.display.clone(),
                    score: (score / self_score).min(1.0),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_store;

    #[test]
    fn test_exact_matches_find_names_in_query() {
        let store = sample_store();
        let index = EntityIndex::new(&store);

        let matches = index.exact_matches("compare psu 1 with the telecom sector");
        let names: Vec<_> = matches.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"PSU-1"));
        assert!(names.contains(&"Telecom"));
        assert!(!names.contains(&"PSU-2"));
    }

    #[test]
    fn test_exact_matches_respect_word_boundaries() {
        let store = sample_store();
        let index = EntityIndex::new(&store);

        // "psu 1" must not match inside "psu 10"
        let matches = index.exact_matches("show psu 10");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_fuzzy_ranks_closest_name_first() {
        let store = sample_store();
        let mut index = EntityIndex::new(&store);

        let matches = index.fuzzy_matches("telecom", 3);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].name, "Telecom");
        assert!(matches[0].score > 0.9);
    }

    #[test]
    fn test_fuzzy_unrelated_token_scores_low() {
        let store = sample_store();
        let mut index = EntityIndex::new(&store);

        let matches = index.fuzzy_matches("quarterly", 3);
        assert!(matches.iter().all(|m| m.score < 0.7));
    }
}
