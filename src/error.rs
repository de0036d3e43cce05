//! Typed errors for the query pipeline.
//!
//! Every failure a caller can see is one of these variants. Degraded
//! language-model conditions are deliberately absent: they live in
//! [`crate::llm::LlmError`] and are absorbed by rule-based fallbacks
//! before they could reach a caller.

use crate::models::{Intent, Year};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// A failure while classifying or analyzing a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A referenced entity does not exist in the data store.
    #[error("unknown {kind}: '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// The classifier could not resolve the query with enough confidence.
    ///
    /// `candidates` carries clarifying options the caller can re-prompt
    /// with; this error is not fatal to the session.
    #[error("query is ambiguous: {reason}")]
    AmbiguousQuery {
        reason: String,
        candidates: Vec<String>,
    },

    /// Fewer records exist than the requested analysis needs.
    #[error(
        "insufficient data for {intent} analysis of '{target}': \
         need {required} year(s) of records, found {available}"
    )]
    InsufficientData {
        intent: Intent,
        target: String,
        required: usize,
        available: usize,
    },

    /// The requested year range contains no years.
    #[error("empty year range: {start}-{end}")]
    EmptyYearRange { start: Year, end: Year },

    /// The requested year range does not overlap the available data.
    #[error("year range {start}-{end} is outside available data ({min}-{max})")]
    YearRangeOutOfBounds {
        start: Year,
        end: Year,
        min: Year,
        max: Year,
    },

    /// The store holds no performance records at all.
    #[error("the dataset contains no performance records")]
    EmptyStore,
}

impl QueryError {
    /// Clarifying candidates for an ambiguous query, empty otherwise.
    pub fn candidates(&self) -> &[String] {
        match self {
            QueryError::AmbiguousQuery { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = QueryError::NotFound {
            kind: "sector",
            name: "Aviation".to_string(),
        };
        assert_eq!(err.to_string(), "unknown sector: 'Aviation'");
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = QueryError::InsufficientData {
            intent: Intent::Trend,
            target: "PSU-1".to_string(),
            required: 2,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("trend"));
        assert!(msg.contains("need 2"));
        assert!(msg.contains("found 1"));
    }

    #[test]
    fn test_candidates_accessor() {
        let err = QueryError::AmbiguousQuery {
            reason: "unrecognized name 'PSU-99'".to_string(),
            candidates: vec!["PSU-9".to_string(), "PSU-19".to_string()],
        };
        assert_eq!(err.candidates().len(), 2);

        let other = QueryError::EmptyStore;
        assert!(other.candidates().is_empty());
    }
}
