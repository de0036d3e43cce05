//! Rule-based policy recommendations.
//!
//! Flagging is deterministic; only the phrasing of a rationale is
//! delegated to the language model, and only with the computed numbers
//! and target identity as input. Any language-model failure degrades to
//! the templated rationale without touching the recommendation itself.

use crate::llm::LanguageClient;
use crate::models::{
    AnalysisResult, GrowthRate, Metric, MetricSeries, Priority, Recommendation, TargetAnalysis,
};
use tracing::{debug, warn};

/// Thresholds for the flagging rules.
#[derive(Debug, Clone)]
pub struct RecommendSettings {
    /// Targets whose latest defined growth rate is below this fraction
    /// get a growth recommendation.
    pub growth_threshold: f64,
    /// Consecutive declining ROI steps needed to flag a target.
    pub roi_decline_years: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            growth_threshold: 0.02,
            roi_decline_years: 2,
        }
    }
}

const PHRASE_SYSTEM_PROMPT: &str = "You write one-sentence rationales for policy recommendations \
about public sector undertakings. Use only the numbers given; do not invent figures or context.";

pub struct Recommender<'a> {
    llm: Option<&'a LanguageClient>,
    settings: &'a RecommendSettings,
}

#[derive(Debug)]
enum Flag {
    LowGrowth { metric: Metric, rate: f64 },
    RoiDecline { steps: usize, from: f64, to: f64 },
}

impl<'a> Recommender<'a> {
    pub fn new(llm: Option<&'a LanguageClient>, settings: &'a RecommendSettings) -> Self {
        Self { llm, settings }
    }

    /// Derive ordered recommendations from an analysis result. The
    /// result itself is never modified.
    pub async fn recommend(&self, result: &AnalysisResult) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for analysis in &result.targets {
            for flag in self.flags_for(analysis, &result.metrics) {
                let action = action_for(&flag, &analysis.name);
                let template =
                    template_rationale(&flag, &analysis.name, self.settings.growth_threshold);
                let rationale = self.phrase_rationale(&template).await;
                recommendations.push(Recommendation {
                    target: analysis.name.clone(),
                    action,
                    rationale,
                    priority: priority_for(&flag),
                });
            }
        }

        recommendations.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.target.cmp(&b.target))
        });
        recommendations
    }

    fn flags_for(&self, analysis: &TargetAnalysis, metrics: &[Metric]) -> Vec<Flag> {
        let mut flags = Vec::new();

        // Growth rule checks the primary (first requested) metric.
        if let Some(series) = metrics.first().and_then(|&m| analysis.series_for(m)) {
            if let Some(segment) = series.growth.last() {
                if let GrowthRate::Defined(rate) = segment.rate {
                    if rate < self.settings.growth_threshold {
                        flags.push(Flag::LowGrowth {
                            metric: series.metric,
                            rate,
                        });
                    }
                }
            }
        }

        if let Some(series) = analysis.series_for(Metric::Roi) {
            if let Some(flag) = self.roi_decline(series) {
                flags.push(flag);
            }
        }

        debug!("{} flags for target {}", flags.len(), analysis.name);
        flags
    }

    /// Trailing run of strictly declining ROI values, if long enough.
    fn roi_decline(&self, series: &MetricSeries) -> Option<Flag> {
        let values: Vec<f64> = series.points.iter().filter_map(|p| p.value).collect();

        let mut steps = 0;
        for pair in values.windows(2).rev() {
            if pair[1] < pair[0] {
                steps += 1;
            } else {
                break;
            }
        }

        if steps >= self.settings.roi_decline_years {
            let from = values[values.len() - 1 - steps];
            let to = values[values.len() - 1];
            Some(Flag::RoiDecline { steps, from, to })
        } else {
            None
        }
    }

    /// Ask the language model to phrase the templated facts, keeping
    /// the template on any failure. One attempt, no retry.
    async fn phrase_rationale(&self, template: &str) -> String {
        let Some(client) = self.llm else {
            return template.to_string();
        };

        match client.complete(PHRASE_SYSTEM_PROMPT, template).await {
            Ok(text) => {
                let phrased = text.trim();
                if phrased.is_empty() {
                    template.to_string()
                } else {
                    phrased.to_string()
                }
            }
            Err(e) => {
                warn!("rationale phrasing degraded to template: {}", e);
                template.to_string()
            }
        }
    }
}

fn action_for(flag: &Flag, target: &str) -> String {
    match flag {
        Flag::LowGrowth { metric, .. } => format!(
            "Commission a {} turnaround review for {}",
            metric.label(),
            target
        ),
        Flag::RoiDecline { .. } => format!(
            "Prioritize {} for a capital-efficiency intervention",
            target
        ),
    }
}

fn template_rationale(flag: &Flag, target: &str, growth_threshold: f64) -> String {
    match flag {
        Flag::LowGrowth { metric, rate } => format!(
            "{}'s latest {} growth was {:.1}%, below the {:.1}% watch threshold.",
            target,
            metric.label(),
            rate * 100.0,
            growth_threshold * 100.0
        ),
        Flag::RoiDecline { steps, from, to } => format!(
            "{}'s ROI declined for {} consecutive periods, from {:.1}% to {:.1}%.",
            target, steps, from, to
        ),
    }
}

fn priority_for(flag: &Flag) -> Priority {
    match flag {
        Flag::RoiDecline { .. } => Priority::High,
        Flag::LowGrowth { .. } => Priority::Medium,
    }
}
