//! Response formatting.
//!
//! [`format`] is a pure function from analysis output and style to a
//! render-agnostic document tree. The same numeric strings appear
//! whatever the style; only the block shapes change. Rendering to text
//! or JSON lives in [`render`].

pub mod render;

use crate::models::{
    AnalysisResult, DatasetOverview, GrowthRate, Metric, MetricSeries, OutputStyle, Ranking,
    Recommendation, Target, TargetAnalysis, Year,
};
use serde::{Deserialize, Serialize};

/// A structured, render-agnostic response document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
}

impl Section {
    fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
            subsections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph { text: String },
    Bullets { items: Vec<String> },
    Table(Table),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Build the response document. Pure and deterministic: identical
/// inputs and style produce an identical tree.
pub fn format(
    result: &AnalysisResult,
    recommendations: Option<&[Recommendation]>,
    style: OutputStyle,
) -> FormattedResponse {
    let metric_list = result
        .metrics
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ");
    let title = format!(
        "{} analysis: {} ({})",
        capitalize(&result.intent.to_string()),
        metric_list,
        result.years
    );

    let mut sections = Vec::new();

    for analysis in &result.targets {
        sections.push(target_section(analysis, style));
    }

    if let Some(ranking) = &result.ranking {
        sections.push(ranking_section(ranking, style));
    }

    if let Some(recommendations) = recommendations {
        if !recommendations.is_empty() {
            sections.push(recommendations_section(recommendations, style));
        }
    }

    FormattedResponse { title, sections }
}

/// Summary document for the loaded dataset.
pub fn format_overview(overview: &DatasetOverview) -> FormattedResponse {
    let mut section = Section::new("Dataset");
    section.blocks.push(Block::Bullets {
        items: vec![
            format!(
                "{} PSUs across {} sectors ({})",
                overview.psu_count,
                overview.sector_count,
                overview.sectors.join(", ")
            ),
            format!("Data from {} to {}", overview.year_min, overview.year_max),
            format!("{} tracked KPIs", overview.kpi_count),
            format!(
                "Total revenue in {}: {}",
                overview.year_max,
                fmt_value(Metric::Revenue, overview.total_revenue_latest)
            ),
            format!(
                "{} profitable and {} loss-making PSUs in {}",
                overview.profitable_psus, overview.loss_making_psus, overview.year_max
            ),
        ],
    });

    FormattedResponse {
        title: "Dataset overview".to_string(),
        sections: vec![section],
    }
}

fn target_section(analysis: &TargetAnalysis, style: OutputStyle) -> Section {
    let heading = match analysis.target {
        Target::Sector(_) => format!("{} (sector)", analysis.name),
        Target::Psu(_) => analysis.name.clone(),
    };
    let mut section = Section::new(heading);

    if analysis.series.len() == 1 {
        section.blocks = series_blocks(&analysis.name, &analysis.series[0], style);
    } else {
        for series in &analysis.series {
            let mut sub = Section::new(capitalize(series.metric.label()));
            sub.blocks = series_blocks(&analysis.name, series, style);
            section.subsections.push(sub);
        }
    }

    section
}

fn series_blocks(name: &str, series: &MetricSeries, style: OutputStyle) -> Vec<Block> {
    match style {
        OutputStyle::Table => {
            let mut blocks = vec![Block::Table(Table {
                headers: vec!["Year".to_string(), capitalize(series.metric.label())],
                rows: series
                    .points
                    .iter()
                    .map(|p| vec![p.year.to_string(), fmt_point(series.metric, p.value)])
                    .collect(),
            })];
            if !series.growth.is_empty() {
                blocks.push(Block::Table(Table {
                    headers: vec!["Period".to_string(), "Growth".to_string()],
                    rows: growth_rows(series),
                }));
            }
            blocks
        }
        OutputStyle::Bullet => {
            let mut items: Vec<String> = series
                .points
                .iter()
                .map(|p| format!("{}: {}", p.year, fmt_point(series.metric, p.value)))
                .collect();
            for row in growth_rows(series) {
                items.push(format!("{}: {}", row[0], row[1]));
            }
            vec![Block::Bullets { items }]
        }
        OutputStyle::Narrative => {
            vec![Block::Paragraph {
                text: narrative_text(name, series),
            }]
        }
    }
}

/// Growth segments plus the overall change, as (label, value) rows.
/// Shared by every style so the numbers cannot drift apart.
fn growth_rows(series: &MetricSeries) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = series
        .growth
        .iter()
        .map(|g| vec![fmt_period(g.from, g.to), fmt_rate(g.rate)])
        .collect();
    if let Some(overall) = series.overall {
        rows.push(vec!["Overall".to_string(), fmt_rate(overall)]);
    }
    rows
}

fn narrative_text(name: &str, series: &MetricSeries) -> String {
    let present: Vec<(Year, f64)> = series
        .points
        .iter()
        .filter_map(|p| p.value.map(|v| (p.year, v)))
        .collect();

    let mut text = match present.as_slice() {
        [] => format!("{} has no {} data in this range.", name, series.metric.label()),
        [(year, value)] => format!(
            "{}'s {} was {} in {}.",
            name,
            series.metric.label(),
            fmt_value(series.metric, *value),
            year
        ),
        [(first_year, first), .., (last_year, last)] => {
            let overall = series
                .overall
                .map(fmt_rate)
                .unwrap_or_else(|| "undefined".to_string());
            format!(
                "{}'s {} moved from {} in {} to {} in {}, an overall change of {}.",
                name,
                series.metric.label(),
                fmt_value(series.metric, *first),
                first_year,
                fmt_value(series.metric, *last),
                last_year,
                overall
            )
        }
    };

    let missing = series.missing_years();
    if !missing.is_empty() {
        let years: Vec<String> = missing.iter().map(|y| y.to_string()).collect();
        text.push_str(&format!(" No data for {}.", years.join(", ")));
    }

    text
}

fn ranking_section(ranking: &Ranking, style: OutputStyle) -> Section {
    let mut section = Section::new(format!("Ranking by {}", ranking.metric.label()));

    match style {
        OutputStyle::Table => {
            section.blocks.push(Block::Table(Table {
                headers: vec![
                    "Rank".to_string(),
                    "PSU".to_string(),
                    "Year".to_string(),
                    capitalize(ranking.metric.label()),
                ],
                rows: ranking
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        vec![
                            (i + 1).to_string(),
                            e.name.clone(),
                            e.year.to_string(),
                            fmt_value(ranking.metric, e.value),
                        ]
                    })
                    .collect(),
            }));
        }
        OutputStyle::Bullet | OutputStyle::Narrative => {
            section.blocks.push(Block::Bullets {
                items: ranking
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        format!(
                            "{}. {}: {} ({})",
                            i + 1,
                            e.name,
                            fmt_value(ranking.metric, e.value),
                            e.year
                        )
                    })
                    .collect(),
            });
        }
    }

    if !ranking.no_data.is_empty() {
        section.blocks.push(Block::Paragraph {
            text: format!(
                "No data in the requested range for: {}.",
                ranking.no_data.join(", ")
            ),
        });
    }

    section
}

fn recommendations_section(recommendations: &[Recommendation], style: OutputStyle) -> Section {
    let mut section = Section::new("Recommendations");

    match style {
        OutputStyle::Table => {
            section.blocks.push(Block::Table(Table {
                headers: vec![
                    "Priority".to_string(),
                    "Target".to_string(),
                    "Action".to_string(),
                    "Rationale".to_string(),
                ],
                rows: recommendations
                    .iter()
                    .map(|r| {
                        vec![
                            r.priority.to_string(),
                            r.target.clone(),
                            r.action.clone(),
                            r.rationale.clone(),
                        ]
                    })
                    .collect(),
            }));
        }
        OutputStyle::Bullet | OutputStyle::Narrative => {
            section.blocks.push(Block::Bullets {
                items: recommendations
                    .iter()
                    .map(|r| format!("[{}] {} — {}", r.priority, r.action, r.rationale))
                    .collect(),
            });
        }
    }

    section
}

fn fmt_point(metric: Metric, value: Option<f64>) -> String {
    match value {
        Some(v) => fmt_value(metric, v),
        None => "no data".to_string(),
    }
}

fn fmt_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Employees => format!("{:.0}", value),
        _ => format!("{:.2}{}", value, metric.unit()),
    }
}

fn fmt_rate(rate: GrowthRate) -> String {
    match rate {
        GrowthRate::Defined(r) => format!("{:+.1}%", r * 100.0),
        GrowthRate::Undefined => "undefined".to_string(),
    }
}

fn fmt_period(from: Year, to: Year) -> String {
    format!("{} to {}", from, to)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
