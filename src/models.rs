//! Data models for the PSU analysis pipeline.
//!
//! This module contains the reference data types (sectors, PSUs,
//! performance records, KPIs) and the request/result types that flow
//! through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type SectorId = u32;
pub type PsuId = u32;
pub type Year = i32;

/// An industry sector grouping PSUs. Immutable reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub description: String,
}

/// A Public Sector Unit. Belongs to exactly one sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Psu {
    pub id: PsuId,
    pub name: String,
    pub sector_id: SectorId,
    pub location: String,
    pub established_year: Year,
}

/// One year of financial performance for one PSU.
///
/// Unique on (psu_id, year). All fields are non-negative except profit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub psu_id: PsuId,
    pub year: Year,
    /// Revenue in INR crore.
    pub revenue: f64,
    /// Net profit in INR crore. May be negative.
    pub profit: f64,
    /// Total assets in INR crore.
    pub assets: f64,
    /// Employee headcount.
    pub employees: f64,
    /// Return on investment, percent.
    pub roi: f64,
    /// Market share within the sector, percent.
    pub market_share: f64,
}

/// A named performance indicator. Reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpi {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<SectorId>,
}

/// A performance metric a query can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Profit,
    Assets,
    Employees,
    Roi,
    MarketShare,
}

impl Metric {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Profit => "profit",
            Metric::Assets => "assets",
            Metric::Employees => "employees",
            Metric::Roi => "ROI",
            Metric::MarketShare => "market share",
        }
    }

    /// Unit suffix for rendered values.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Revenue | Metric::Profit | Metric::Assets => " cr",
            Metric::Employees => "",
            Metric::Roi | Metric::MarketShare => "%",
        }
    }

    /// Extract this metric's value from a record.
    pub fn value_of(&self, record: &PerformanceRecord) -> f64 {
        match self {
            Metric::Revenue => record.revenue,
            Metric::Profit => record.profit,
            Metric::Assets => record.assets,
            Metric::Employees => record.employees,
            Metric::Roi => record.roi,
            Metric::MarketShare => record.market_share,
        }
    }

    /// Resolve a query keyword to a metric, if it names one.
    pub fn from_keyword(word: &str) -> Option<Metric> {
        match word.to_lowercase().as_str() {
            "revenue" | "revenues" | "turnover" | "sales" => Some(Metric::Revenue),
            "profit" | "profits" | "income" | "earnings" | "profitability" => Some(Metric::Profit),
            "asset" | "assets" => Some(Metric::Assets),
            "employee" | "employees" | "headcount" | "staff" | "workforce" => {
                Some(Metric::Employees)
            }
            "roi" | "return" | "returns" => Some(Metric::Roi),
            "market_share" | "share" => Some(Metric::MarketShare),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The analytical operation a query requests. A closed set: dispatch on
/// this enum is exhaustive, there is no open-ended string routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Trend,
    Comparison,
    Ranking,
    SingleMetric,
}

impl Intent {
    /// Resolve a name (as the language model returns it) to an intent.
    pub fn from_name(name: &str) -> Option<Intent> {
        match name.trim().to_lowercase().as_str() {
            "trend" => Some(Intent::Trend),
            "comparison" | "compare" => Some(Intent::Comparison),
            "ranking" | "rank" => Some(Intent::Ranking),
            "single_metric" | "single-metric" | "single" => Some(Intent::SingleMetric),
            _ => None,
        }
    }

    /// Minimum distinct years of data a target needs for this intent.
    pub fn min_years(&self) -> usize {
        match self {
            Intent::Trend => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Trend => "trend",
            Intent::Comparison => "comparison",
            Intent::Ranking => "ranking",
            Intent::SingleMetric => "single-metric",
        };
        write!(f, "{}", name)
    }
}

/// How the formatter lays out the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Bullet,
    Narrative,
    Table,
}

/// An inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: Year,
    pub end: Year,
}

impl YearRange {
    pub fn new(start: Year, end: Year) -> Self {
        Self { start, end }
    }

    pub fn single(year: Year) -> Self {
        Self { start: year, end: year }
    }

    /// Whether a year falls inside the range.
    #[allow(dead_code)] // Utility for callers filtering records
    pub fn contains(&self, year: Year) -> bool {
        year >= self.start && year <= self.end
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start..=self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A sector or PSU a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Target {
    Sector(SectorId),
    Psu(PsuId),
}

/// A classified query, ready for the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub intent: Intent,
    /// Empty means "all PSUs".
    pub targets: Vec<Target>,
    pub years: YearRange,
    pub metrics: Vec<Metric>,
    pub style: OutputStyle,
    pub with_recommendations: bool,
    /// Cap on ranking entries ("top 5"); `None` ranks everything.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// A year-over-year percentage change.
///
/// `Undefined` marks a zero base year; infinity and NaN never appear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthRate {
    Defined(f64),
    Undefined,
}

impl GrowthRate {
    /// `(new - old) / old`, guarded against a zero base.
    pub fn compute(old: f64, new: f64) -> GrowthRate {
        if old == 0.0 {
            GrowthRate::Undefined
        } else {
            GrowthRate::Defined((new - old) / old)
        }
    }

    pub fn as_defined(&self) -> Option<f64> {
        match self {
            GrowthRate::Defined(rate) => Some(*rate),
            GrowthRate::Undefined => None,
        }
    }
}

/// One year on the request's axis. `None` means no record exists for
/// that year; values are never synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub year: Year,
    pub value: Option<f64>,
}

/// Growth between two consecutive years with data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthSegment {
    pub from: Year,
    pub to: Year,
    pub rate: GrowthRate,
}

/// One metric's values and growth for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: Metric,
    /// One point per year of the requested range, in order.
    pub points: Vec<DataPoint>,
    /// Segments between consecutive years that have data.
    pub growth: Vec<GrowthSegment>,
    /// First-to-last present year; `None` with fewer than two data years.
    pub overall: Option<GrowthRate>,
}

impl MetricSeries {
    /// Years of the range with no data.
    pub fn missing_years(&self) -> Vec<Year> {
        self.points
            .iter()
            .filter(|p| p.value.is_none())
            .map(|p| p.year)
            .collect()
    }

    /// The latest point that has a value, if any.
    pub fn latest_value(&self) -> Option<(Year, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.value.map(|v| (p.year, v)))
    }
}

/// Everything computed for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAnalysis {
    pub target: Target,
    pub name: String,
    pub series: Vec<MetricSeries>,
}

impl TargetAnalysis {
    pub fn series_for(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.iter().find(|s| s.metric == metric)
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankEntry {
    pub psu_id: PsuId,
    pub name: String,
    /// Latest in-range year the value comes from.
    pub year: Year,
    pub value: f64,
}

/// A deterministic ordering of targets by a metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub metric: Metric,
    pub entries: Vec<RankEntry>,
    /// Names of targets with no data in the requested range.
    pub no_data: Vec<String>,
}

/// The analysis engine's output for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub intent: Intent,
    pub years: YearRange,
    pub metrics: Vec<Metric>,
    pub targets: Vec<TargetAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
}

/// Priority tier of a recommendation. Ordered highest-first so a plain
/// ascending sort lists urgent items at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

/// A policy/action suggestion for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub target: String,
    pub action: String,
    pub rationale: String,
    pub priority: Priority,
}

/// High-level summary of the loaded dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub psu_count: usize,
    pub sector_count: usize,
    pub kpi_count: usize,
    pub sectors: Vec<String>,
    pub year_min: Year,
    pub year_max: Year,
    pub total_revenue_latest: f64,
    pub profitable_psus: usize,
    pub loss_making_psus: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_from_keyword() {
        assert_eq!(Metric::from_keyword("revenue"), Some(Metric::Revenue));
        assert_eq!(Metric::from_keyword("ROI"), Some(Metric::Roi));
        assert_eq!(Metric::from_keyword("headcount"), Some(Metric::Employees));
        assert_eq!(Metric::from_keyword("market_share"), Some(Metric::MarketShare));
        assert_eq!(Metric::from_keyword("widgets"), None);
    }

    #[test]
    fn test_intent_from_name() {
        assert_eq!(Intent::from_name("trend"), Some(Intent::Trend));
        assert_eq!(Intent::from_name("COMPARISON"), Some(Intent::Comparison));
        assert_eq!(Intent::from_name("single_metric"), Some(Intent::SingleMetric));
        assert_eq!(Intent::from_name("prophecy"), None);
    }

    #[test]
    fn test_growth_rate_guards_zero_base() {
        assert_eq!(GrowthRate::compute(100.0, 150.0), GrowthRate::Defined(0.5));
        assert_eq!(GrowthRate::compute(0.0, 150.0), GrowthRate::Undefined);
    }

    #[test]
    fn test_year_range() {
        let range = YearRange::new(2020, 2022);
        assert!(range.contains(2021));
        assert!(!range.contains(2023));
        assert_eq!(range.years().collect::<Vec<_>>(), vec![2020, 2021, 2022]);
        assert_eq!(range.to_string(), "2020-2022");
        assert_eq!(YearRange::single(2021).to_string(), "2021");
    }

    #[test]
    fn test_priority_orders_high_first() {
        let mut tiers = vec![Priority::Low, Priority::High, Priority::Medium];
        tiers.sort();
        assert_eq!(tiers, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_series_missing_and_latest() {
        let series = MetricSeries {
            metric: Metric::Revenue,
            points: vec![
                DataPoint { year: 2020, value: Some(100.0) },
                DataPoint { year: 2021, value: None },
                DataPoint { year: 2022, value: Some(150.0) },
            ],
            growth: vec![],
            overall: None,
        };
        assert_eq!(series.missing_years(), vec![2021]);
        assert_eq!(series.latest_value(), Some((2022, 150.0)));
    }

    #[test]
    fn test_request_round_trips_through_json() {
        let request = AnalysisRequest {
            intent: Intent::Comparison,
            targets: vec![Target::Psu(1), Target::Sector(2)],
            years: YearRange::new(2020, 2024),
            metrics: vec![Metric::Roi],
            style: OutputStyle::Table,
            with_recommendations: false,
            limit: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: AnalysisRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.intent, Intent::Comparison);
        assert_eq!(back.targets, request.targets);
        assert_eq!(back.years, request.years);
    }
}
