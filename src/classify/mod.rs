//! Intent classification: free text in, structured request out.
//!
//! Deterministic extraction runs first and is authoritative for entity,
//! metric, year and style resolution. The language model is consulted
//! only when the intent (or a default year range) cannot be pinned by
//! rules, and its reply is validated against the closed vocabulary
//! before acceptance; anything invalid falls back to rule defaults.

pub mod entities;

use crate::error::{QueryError, Result};
use crate::llm::{extract_json_object, LanguageClient};
use crate::models::{AnalysisRequest, Intent, Metric, OutputStyle, Target, YearRange};
use crate::store::{normalize_name, DataStore};
use entities::EntityIndex;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

const COMPARISON_WORDS: &[&str] = &["compare", "comparison", "compared", "versus", "vs", "against"];
const RANKING_WORDS: &[&str] = &[
    "top", "best", "worst", "rank", "ranking", "ranked", "leaders", "leading", "highest", "lowest",
];
const TREND_WORDS: &[&str] = &[
    "trend", "trends", "trajectory", "growth", "grow", "growing", "evolution", "history",
    "decline", "declining", "improving", "improvement",
];
const RECOMMEND_WORDS: &[&str] = &[
    "recommend", "recommendation", "recommendations", "suggest", "suggestion", "suggestions",
    "policy", "policies", "advice", "advise", "action", "actions",
];

/// Words never probed as entity names.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "in", "on", "by", "to", "for", "with", "from", "between",
    "is", "are", "was", "were", "this", "that", "these", "those", "their", "its", "all", "per",
    "each", "me", "us", "please", "show", "give", "tell", "list", "what", "which", "how", "did",
    "does", "do", "has", "have", "had", "year", "years", "latest", "recent", "current", "since",
    "until", "through", "during", "over", "time", "performance", "performing", "performed",
    "analysis", "analyze", "analyse", "sector", "sectors", "psu", "psus", "unit", "units",
    "undertaking", "undertakings", "company", "companies", "metric", "metrics", "data", "figures",
    "numbers", "table", "tables", "narrative", "paragraph", "summary", "bullet", "bullets",
    "india", "indian", "ministry", "government",
];

/// Tuning knobs for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Minimum normalized fuzzy score to silently accept a resolution.
    pub fuzzy_accept: f32,
    /// How many clarifying candidates to attach to an ambiguous query.
    pub max_candidates: usize,
    pub default_style: OutputStyle,
    pub force_recommendations: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            fuzzy_accept: 0.75,
            max_candidates: 3,
            default_style: OutputStyle::Bullet,
            force_recommendations: false,
        }
    }
}

/// Strict-JSON reply requested from the language model.
#[derive(Debug, Deserialize)]
struct LlmIntentReply {
    intent: String,
    #[serde(default)]
    year_start: Option<i32>,
    #[serde(default)]
    year_end: Option<i32>,
}

const CLASSIFY_SYSTEM_PROMPT: &str = "You classify analytical queries about public sector \
undertakings. Reply with exactly one JSON object, no prose: \
{\"intent\": \"trend\" | \"comparison\" | \"ranking\" | \"single_metric\", \
\"year_start\": <year or null>, \"year_end\": <year or null>}";

/// Classifies one query. Build per query; holds a fuzzy matcher that
/// needs mutable access.
pub struct Classifier<'a> {
    store: &'a DataStore,
    llm: Option<&'a LanguageClient>,
    settings: ClassifierSettings,
    entities: EntityIndex,
    span_re: Regex,
    year_re: Regex,
}

impl<'a> Classifier<'a> {
    pub fn new(
        store: &'a DataStore,
        llm: Option<&'a LanguageClient>,
        settings: ClassifierSettings,
    ) -> Self {
        Self {
            store,
            llm,
            settings,
            entities: EntityIndex::new(store),
            span_re: Regex::new(r"(\d{4})\s*(?:-|–|—|to|through|until)\s*(\d{4})")
                .expect("valid span regex"),
            year_re: Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"),
        }
    }

    /// Map free text to an [`AnalysisRequest`].
    pub async fn classify(&mut self, text: &str) -> Result<AnalysisRequest> {
        let normalized = normalize_name(text);
        let explicit_years = self.extract_years(text);

        let (targets, metrics, limit) = self.extract_entities_and_metrics(text, &normalized)?;

        let tokens: Vec<String> = normalized.split_whitespace().map(str::to_string).collect();
        let has = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

        let style = self.extract_style(&tokens);
        let with_recommendations = self.settings.force_recommendations || has(RECOMMEND_WORDS);

        // Rule-based intent resolution; precedence mirrors how queries
        // read: an explicit comparison wins, then ranking, then trend.
        let mut intent = if has(COMPARISON_WORDS) {
            Some(Intent::Comparison)
        } else if has(RANKING_WORDS) {
            Some(Intent::Ranking)
        } else if has(TREND_WORDS) {
            Some(Intent::Trend)
        } else if targets.len() >= 2 {
            Some(Intent::Comparison)
        } else if explicit_years.map(|r| r.start == r.end) == Some(true)
            && targets.len() == 1
            && !metrics.is_empty()
        {
            Some(Intent::SingleMetric)
        } else {
            None
        };

        let mut years = explicit_years;

        // The language model only fills the gaps rules left open, and
        // only with values that validate against the known vocabulary.
        if intent.is_none() || years.is_none() {
            if let Some(reply) = self.consult_llm(text).await {
                if intent.is_none() {
                    intent = Intent::from_name(&reply.intent);
                    if intent.is_none() {
                        warn!(
                            "language model returned unrecognized intent '{}', using rule default",
                            reply.intent
                        );
                    }
                }
                if years.is_none() {
                    years = self.validate_llm_years(&reply);
                }
            }
        }

        let intent = intent.unwrap_or(Intent::Trend);

        let years = match years {
            Some(range) => range,
            None => {
                let (min, max) = self.store.year_bounds().ok_or(QueryError::EmptyStore)?;
                YearRange::new(min, max)
            }
        };
        if years.is_empty() {
            return Err(QueryError::EmptyYearRange {
                start: years.start,
                end: years.end,
            });
        }

        let metrics = if metrics.is_empty() {
            vec![Metric::Revenue]
        } else {
            metrics
        };

        debug!(
            "classified intent={} targets={} metrics={:?} years={}",
            intent,
            targets.len(),
            metrics,
            years
        );

        Ok(AnalysisRequest {
            intent,
            targets,
            years,
            metrics,
            style,
            with_recommendations,
            limit,
        })
    }

    /// Entity, metric and "top N" extraction in one deterministic pass.
    fn extract_entities_and_metrics(
        &mut self,
        text: &str,
        normalized: &str,
    ) -> Result<(Vec<Target>, Vec<Metric>, Option<usize>)> {
        let mut targets: Vec<Target> = Vec::new();
        let mut metrics: Vec<Metric> = Vec::new();
        let mut limit: Option<usize> = None;

        // Whole-query exact pass catches multi-word names.
        let mut consumed_words: Vec<String> = Vec::new();
        for m in self.entities.exact_matches(normalized) {
            if !targets.contains(&m.target) {
                targets.push(m.target);
            }
            consumed_words.extend(normalize_name(&m.name).split_whitespace().map(str::to_string));
        }

        let raw_tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .collect();

        let mut ambiguous: Option<(String, Vec<String>)> = None;
        let mut index = 0;
        while index < raw_tokens.len() {
            let raw = raw_tokens[index];
            let mut norm = normalize_name(raw);
            let mut display = raw.to_string();
            index += 1;

            if norm.is_empty() {
                continue;
            }

            // Merge "psu" + number into one reference ("PSU 4" -> "psu 4").
            if norm == "psu" && index < raw_tokens.len() {
                if let Ok(num) = raw_tokens[index].parse::<u32>() {
                    norm = format!("psu {}", num);
                    display = format!("PSU-{}", num);
                    index += 1;
                }
            }

            if norm.chars().all(|c| c.is_ascii_digit()) {
                // A bare small number reads as a result cap ("top 5");
                // only ranking ever consumes it.
                if let Ok(n) = norm.parse::<usize>() {
                    if (1..=100).contains(&n) {
                        limit = Some(n);
                    }
                }
                continue;
            }
            if let Some(metric) = Metric::from_keyword(&norm) {
                if !metrics.contains(&metric) {
                    metrics.push(metric);
                }
                continue;
            }
            if STOPWORDS.contains(&norm.as_str()) || consumed_words.contains(&norm) {
                continue;
            }

            if let Some(psu) = self.store.find_psu_by_name(&norm) {
                let target = Target::Psu(psu.id);
                if !targets.contains(&target) {
                    targets.push(target);
                }
                continue;
            }
            if let Some(sector) = self.store.find_sector_by_name(&norm) {
                let target = Target::Sector(sector.id);
                if !targets.contains(&target) {
                    targets.push(target);
                }
                continue;
            }

            // An explicit "PSU-N" reference that resolves to nothing is
            // a hard miss, not a fuzzy near-miss.
            if norm.starts_with("psu ") {
                return Err(QueryError::NotFound {
                    kind: "PSU",
                    name: display,
                });
            }

            if norm.len() < 3 {
                continue;
            }

            let candidates = self
                .entities
                .fuzzy_matches(&norm, self.settings.max_candidates);
            if let Some(best) = candidates.first() {
                if best.score >= self.settings.fuzzy_accept {
                    if !targets.contains(&best.target) {
                        targets.push(best.target);
                    }
                    continue;
                }
            }

            // A capitalized mid-sentence token reads as a proper name;
            // failing to resolve it means the query needs clarification.
            if looks_like_name(raw, index - 1) && ambiguous.is_none() {
                let names = candidates.into_iter().map(|c| c.name).collect();
                ambiguous = Some((display, names));
            }
        }

        if let Some((token, candidates)) = ambiguous {
            return Err(QueryError::AmbiguousQuery {
                reason: format!("unrecognized name '{}'", token),
                candidates,
            });
        }

        Ok((targets, metrics, limit))
    }

    fn extract_style(&self, tokens: &[String]) -> OutputStyle {
        if tokens.iter().any(|t| t == "table" || t == "tables") {
            OutputStyle::Table
        } else if tokens
            .iter()
            .any(|t| t == "narrative" || t == "paragraph" || t == "summary")
        {
            OutputStyle::Narrative
        } else {
            self.settings.default_style
        }
    }

    /// Explicit year ranges in the raw text, if any.
    fn extract_years(&self, text: &str) -> Option<YearRange> {
        if let Some(caps) = self.span_re.captures(text) {
            let a: i32 = caps[1].parse().ok()?;
            let b: i32 = caps[2].parse().ok()?;
            return Some(YearRange::new(a.min(b), a.max(b)));
        }

        let mut years: Vec<i32> = self
            .year_re
            .find_iter(text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        years.sort_unstable();
        years.dedup();

        match years.as_slice() {
            [] => None,
            [single] => {
                let lowered = text.to_lowercase();
                let open_ended = lowered.contains("since") || lowered.contains("from");
                if open_ended {
                    let (_, max) = self.store.year_bounds()?;
                    Some(YearRange::new(*single, max.max(*single)))
                } else {
                    Some(YearRange::single(*single))
                }
            }
            [first, .., last] => Some(YearRange::new(*first, *last)),
        }
    }

    async fn consult_llm(&self, text: &str) -> Option<LlmIntentReply> {
        let client = self.llm?;

        match client.complete(CLASSIFY_SYSTEM_PROMPT, text).await {
            Ok(reply) => {
                let json = extract_json_object(&reply)?;
                match serde_json::from_str::<LlmIntentReply>(json) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!("language model reply did not parse ({}), using rule defaults", e);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("language model unavailable for intent ({}), using rule defaults", e);
                None
            }
        }
    }

    /// Years from the model are accepted only when they form a
    /// non-empty range inside the available data.
    fn validate_llm_years(&self, reply: &LlmIntentReply) -> Option<YearRange> {
        let (start, end) = (reply.year_start?, reply.year_end?);
        let (min, max) = self.store.year_bounds()?;
        if start <= end && start >= min && end <= max {
            Some(YearRange::new(start, end))
        } else {
            debug!(
                "discarding out-of-range years {}-{} from language model",
                start, end
            );
            None
        }
    }
}

/// True when a raw token is capitalized mid-sentence (reads as a
/// proper name rather than an ordinary word).
fn looks_like_name(raw: &str, position: usize) -> bool {
    position > 0 && raw.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_store;

    async fn classify(text: &str) -> Result<AnalysisRequest> {
        let store = sample_store();
        let mut classifier = Classifier::new(&store, None, ClassifierSettings::default());
        classifier.classify(text).await
    }

    #[tokio::test]
    async fn test_comparison_query_resolves_without_llm() {
        let request = classify("compare ROI of PSU-1 and PSU-2 in 2021").await.unwrap();

        assert_eq!(request.intent, Intent::Comparison);
        assert_eq!(request.targets, vec![Target::Psu(1), Target::Psu(2)]);
        assert_eq!(request.metrics, vec![Metric::Roi]);
        assert_eq!(request.years, YearRange::single(2021));
        assert!(!request.with_recommendations);
    }

    #[tokio::test]
    async fn test_trend_query_defaults_to_full_range_and_revenue() {
        let request = classify("revenue trend for PSU-1").await.unwrap();

        assert_eq!(request.intent, Intent::Trend);
        assert_eq!(request.targets, vec![Target::Psu(1)]);
        assert_eq!(request.metrics, vec![Metric::Revenue]);
        // full available range of the sample store
        assert_eq!(request.years, YearRange::new(2020, 2023));
    }

    #[tokio::test]
    async fn test_ranking_query_with_sector_and_limit() {
        let request = classify("top 2 energy PSUs by profit").await.unwrap();

        assert_eq!(request.intent, Intent::Ranking);
        assert_eq!(request.targets, vec![Target::Sector(1)]);
        assert_eq!(request.metrics, vec![Metric::Profit]);
        assert_eq!(request.limit, Some(2));
    }

    #[tokio::test]
    async fn test_year_span_extraction() {
        let request = classify("profit trend for PSU-2 2020-2022").await.unwrap();
        assert_eq!(request.years, YearRange::new(2020, 2022));

        let request = classify("profit of PSU-2 since 2021").await.unwrap();
        assert_eq!(request.years, YearRange::new(2021, 2023));
    }

    #[tokio::test]
    async fn test_unknown_psu_reference_is_not_found() {
        let err = classify("revenue trend for PSU-9").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound { kind: "PSU", .. }));
    }

    #[tokio::test]
    async fn test_unrecognized_proper_name_is_ambiguous() {
        let err = classify("show revenue for Telvana").await.unwrap_err();
        match err {
            QueryError::AmbiguousQuery { reason, .. } => {
                assert!(reason.contains("Telvana"));
            }
            other => panic!("expected AmbiguousQuery, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_two_targets_imply_comparison() {
        let request = classify("PSU-1 and PSU-3 revenue 2020-2023").await.unwrap();
        assert_eq!(request.intent, Intent::Comparison);
        assert_eq!(request.targets.len(), 2);
    }

    #[tokio::test]
    async fn test_recommendation_and_style_keywords() {
        let request = classify("revenue trend for PSU-2 with policy recommendations as a table")
            .await
            .unwrap();
        assert!(request.with_recommendations);
        assert_eq!(request.style, OutputStyle::Table);
    }

    #[tokio::test]
    async fn test_no_keywords_falls_back_to_trend() {
        // no intent keywords, no LLM configured: rule default applies
        let request = classify("PSU-2 revenue").await.unwrap();
        assert_eq!(request.intent, Intent::Trend);
    }
}
