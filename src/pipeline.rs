//! The query pipeline driver.
//!
//! One explicit call chain: classify, analyze, optionally recommend,
//! format. The component set is fixed, so composition is plain function
//! calls rather than a dynamic agent registry. Any presentation layer
//! (CLI, API, dashboard) consumes [`Pipeline::handle_query`].

use crate::classify::{Classifier, ClassifierSettings};
use crate::engine;
use crate::error::Result;
use crate::format::{self, FormattedResponse};
use crate::llm::LanguageClient;
use crate::models::{Intent, Metric};
use crate::recommend::{RecommendSettings, Recommender};
use crate::store::DataStore;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

/// Tuning for the pipeline's components.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub classifier: ClassifierSettings,
    pub recommend: RecommendSettings,
}

/// Bookkeeping about one handled query.
#[derive(Debug, Clone)]
pub struct QueryMeta {
    pub intent: Intent,
    pub target_count: usize,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// A handled query: the document plus its metadata.
#[derive(Debug)]
pub struct QueryOutcome {
    pub response: FormattedResponse,
    pub meta: QueryMeta,
}

/// Owns the read-only store and the optional language client.
pub struct Pipeline {
    store: DataStore,
    llm: Option<LanguageClient>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(store: DataStore, llm: Option<LanguageClient>, settings: PipelineSettings) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Process one query end to end.
    pub async fn handle_query(&self, text: &str) -> Result<QueryOutcome> {
        let started = Instant::now();

        let mut classifier = Classifier::new(
            &self.store,
            self.llm.as_ref(),
            self.settings.classifier.clone(),
        );
        let mut request = classifier.classify(text).await?;
        info!(
            "classified as {} over {} ({} target(s))",
            request.intent,
            request.years,
            request.targets.len()
        );

        // The ROI rule needs an ROI series to look at.
        if request.with_recommendations && !request.metrics.contains(&Metric::Roi) {
            request.metrics.push(Metric::Roi);
        }

        let result = engine::analyze(&request, &self.store)?;
        debug!("analyzed {} target(s)", result.targets.len());

        let recommendations = if request.with_recommendations {
            let recommender = Recommender::new(self.llm.as_ref(), &self.settings.recommend);
            let recommendations = recommender.recommend(&result).await;
            info!("{} recommendation(s)", recommendations.len());
            Some(recommendations)
        } else {
            None
        };

        let response = format::format(&result, recommendations.as_deref(), request.style);

        Ok(QueryOutcome {
            response,
            meta: QueryMeta {
                intent: request.intent,
                target_count: result.targets.len(),
                generated_at: Utc::now(),
                duration_seconds: started.elapsed().as_secs_f64(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::format::Block;
    use crate::store::tests::sample_store;

    fn pipeline() -> Pipeline {
        Pipeline::new(sample_store(), None, PipelineSettings::default())
    }

    #[tokio::test]
    async fn test_end_to_end_trend_query() {
        let outcome = pipeline()
            .handle_query("revenue trend for PSU-1 2020-2022")
            .await
            .unwrap();

        assert_eq!(outcome.meta.intent, Intent::Trend);
        assert_eq!(outcome.meta.target_count, 1);

        let text = serde_json::to_string(&outcome.response).unwrap();
        assert!(text.contains("+50.0%"));
        assert!(text.contains("2021: no data"));
    }

    #[tokio::test]
    async fn test_end_to_end_comparison_query() {
        let outcome = pipeline()
            .handle_query("compare ROI of PSU-1 and PSU-2 in 2021")
            .await
            .unwrap();

        assert_eq!(outcome.meta.intent, Intent::Comparison);
        assert_eq!(outcome.meta.target_count, 2);
    }

    #[tokio::test]
    async fn test_end_to_end_ranking_query() {
        let outcome = pipeline()
            .handle_query("rank PSUs by revenue 2020-2022")
            .await
            .unwrap();

        assert_eq!(outcome.meta.intent, Intent::Ranking);
        let ranking = outcome
            .response
            .sections
            .iter()
            .find(|s| s.heading.starts_with("Ranking"))
            .expect("ranking section");
        match &ranking.blocks[0] {
            Block::Bullets { items } => {
                assert!(items[0].starts_with("1. PSU-2"));
            }
            other => panic!("expected bullets, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recommendations_work_without_language_client() {
        // No LLM configured: rationales fall back to templates and the
        // query still succeeds.
        let outcome = pipeline()
            .handle_query("revenue trend for PSU-2 2020-2022 with recommendations")
            .await
            .unwrap();

        let section = outcome
            .response
            .sections
            .iter()
            .find(|s| s.heading == "Recommendations")
            .expect("recommendations section");
        assert!(!section.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_ambiguous_query_surfaces_candidates() {
        let err = pipeline()
            .handle_query("revenue trend for Telvana")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousQuery { .. }));
    }
}
