//! Analysis engine: computes the requested metrics from the store.
//!
//! Pure computation over the read-only store. Missing years stay
//! missing (explicit no-data points), zero-base growth is flagged
//! undefined, and every ordering is deterministic.

use crate::error::{QueryError, Result};
use crate::models::{
    AnalysisRequest, AnalysisResult, DataPoint, DatasetOverview, GrowthRate, GrowthSegment,
    Intent, Metric, MetricSeries, PsuId, RankEntry, Ranking, Target, TargetAnalysis, Year,
    YearRange,
};
use crate::store::DataStore;
use std::collections::BTreeSet;

/// One analyzable unit: a PSU by itself, or a sector's member set.
struct Unit {
    target: Target,
    name: String,
    psus: BTreeSet<PsuId>,
}

/// Run one classified request against the store.
pub fn analyze(request: &AnalysisRequest, store: &DataStore) -> Result<AnalysisResult> {
    let (min, max) = store.year_bounds().ok_or(QueryError::EmptyStore)?;
    let years = request.years;

    if years.is_empty() {
        return Err(QueryError::EmptyYearRange {
            start: years.start,
            end: years.end,
        });
    }
    if years.end < min || years.start > max {
        return Err(QueryError::YearRangeOutOfBounds {
            start: years.start,
            end: years.end,
            min,
            max,
        });
    }

    let units = resolve_units(request, store)?;

    let mut targets = Vec::with_capacity(units.len());
    for unit in &units {
        if request.intent == Intent::Trend {
            let available = data_years(unit, &years, store);
            let required = Intent::Trend.min_years();
            if available < required {
                return Err(QueryError::InsufficientData {
                    intent: Intent::Trend,
                    target: unit.name.clone(),
                    required,
                    available,
                });
            }
        }

        let series = request
            .metrics
            .iter()
            .map(|&metric| unit_series(unit, metric, &years, store))
            .collect();

        targets.push(TargetAnalysis {
            target: unit.target,
            name: unit.name.clone(),
            series,
        });
    }

    let ranking = if request.intent == Intent::Ranking {
        Some(build_ranking(&targets, request))
    } else {
        None
    };

    Ok(AnalysisResult {
        intent: request.intent,
        years,
        metrics: request.metrics.clone(),
        targets,
        ranking,
    })
}

/// High-level dataset summary for the latest year on record.
pub fn overview(store: &DataStore) -> Result<DatasetOverview> {
    let (year_min, year_max) = store.year_bounds().ok_or(QueryError::EmptyStore)?;

    let mut total_revenue_latest = 0.0;
    let mut profitable_psus = 0;
    let mut loss_making_psus = 0;
    for &psu_id in store.psus().keys() {
        if let Some(record) = store.record(psu_id, year_max) {
            total_revenue_latest += record.revenue;
            if record.profit > 0.0 {
                profitable_psus += 1;
            } else {
                loss_making_psus += 1;
            }
        }
    }

    Ok(DatasetOverview {
        psu_count: store.psus().len(),
        sector_count: store.sectors().len(),
        kpi_count: store.kpis().len(),
        sectors: store.sectors().values().map(|s| s.name.clone()).collect(),
        year_min,
        year_max,
        total_revenue_latest,
        profitable_psus,
        loss_making_psus,
    })
}

/// Expand request targets into units. An empty target list means every
/// PSU individually; sector targets under a ranking intent expand to
/// their member PSUs so the ranking stays a PSU-level total order.
fn resolve_units(request: &AnalysisRequest, store: &DataStore) -> Result<Vec<Unit>> {
    let mut units: Vec<Unit> = Vec::new();
    let push_psu = |units: &mut Vec<Unit>, id: PsuId| -> Result<()> {
        let psu = store.psu(id)?;
        let target = Target::Psu(id);
        if !units.iter().any(|u| u.target == target) {
            units.push(Unit {
                target,
                name: psu.name.clone(),
                psus: BTreeSet::from([id]),
            });
        }
        Ok(())
    };

    if request.targets.is_empty() {
        for &id in store.psus().keys() {
            push_psu(&mut units, id)?;
        }
        return Ok(units);
    }

    for &target in &request.targets {
        match target {
            Target::Psu(id) => push_psu(&mut units, id)?,
            Target::Sector(id) => {
                let sector = store.sector(id)?;
                let members = store.psus_in_sector(id)?;
                if request.intent == Intent::Ranking {
                    for &psu_id in members {
                        push_psu(&mut units, psu_id)?;
                    }
                } else if !units.iter().any(|u| u.target == target) {
                    units.push(Unit {
                        target,
                        name: sector.name.clone(),
                        psus: members.clone(),
                    });
                }
            }
        }
    }

    Ok(units)
}

/// Distinct years in range for which the unit has at least one record.
fn data_years(unit: &Unit, years: &YearRange, store: &DataStore) -> usize {
    let distinct: BTreeSet<Year> = store
        .performance(&unit.psus, years)
        .iter()
        .map(|record| record.year)
        .collect();
    distinct.len()
}

/// Build one metric's aligned series for a unit.
fn unit_series(unit: &Unit, metric: Metric, years: &YearRange, store: &DataStore) -> MetricSeries {
    let points: Vec<DataPoint> = years
        .years()
        .map(|year| DataPoint {
            year,
            value: unit_value(unit, metric, year, store),
        })
        .collect();

    let (growth, overall) = if unit.psus.len() == 1 {
        psu_growth(&points)
    } else {
        sector_growth(unit, metric, &points, years, store)
    };

    MetricSeries {
        metric,
        points,
        growth,
        overall,
    }
}

/// A unit's value for one year: the PSU's own value, or the unweighted
/// mean of member values present that year. No member data, no value.
fn unit_value(unit: &Unit, metric: Metric, year: Year, store: &DataStore) -> Option<f64> {
    let values: Vec<f64> = unit
        .psus
        .iter()
        .filter_map(|&id| store.record(id, year).map(|r| metric.value_of(r)))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Growth for a single PSU: segments between consecutive present years,
/// plus first-to-last overall change.
fn psu_growth(points: &[DataPoint]) -> (Vec<GrowthSegment>, Option<GrowthRate>) {
    let present: Vec<(Year, f64)> = points
        .iter()
        .filter_map(|p| p.value.map(|v| (p.year, v)))
        .collect();

    let growth = present
        .windows(2)
        .map(|pair| GrowthSegment {
            from: pair[0].0,
            to: pair[1].0,
            rate: GrowthRate::compute(pair[0].1, pair[1].1),
        })
        .collect();

    let overall = match present.as_slice() {
        [] | [_] => None,
        [(_, first), .., (_, last)] => Some(GrowthRate::compute(*first, *last)),
    };

    (growth, overall)
}

/// Sector growth aggregates as the simple mean of member PSU growth
/// rates (unweighted). Members whose rate is undefined (zero base) are
/// excluded from the mean; a pair with no defined member rate is
/// undefined.
fn sector_growth(
    unit: &Unit,
    metric: Metric,
    points: &[DataPoint],
    years: &YearRange,
    store: &DataStore,
) -> (Vec<GrowthSegment>, Option<GrowthRate>) {
    let present_years: Vec<Year> = points
        .iter()
        .filter(|p| p.value.is_some())
        .map(|p| p.year)
        .collect();

    let growth = present_years
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let rates: Vec<f64> = unit
                .psus
                .iter()
                .filter_map(|&id| {
                    let old = store.record(id, from).map(|r| metric.value_of(r))?;
                    let new = store.record(id, to).map(|r| metric.value_of(r))?;
                    GrowthRate::compute(old, new).as_defined()
                })
                .collect();
            GrowthSegment {
                from,
                to,
                rate: mean_rate(&rates),
            }
        })
        .collect();

    let overall_rates: Vec<f64> = unit
        .psus
        .iter()
        .filter_map(|&id| {
            let records = store.psu_records(id, years);
            match records.as_slice() {
                [] | [_] => None,
                [first, .., last] => {
                    GrowthRate::compute(metric.value_of(first), metric.value_of(last))
                        .as_defined()
                }
            }
        })
        .collect();

    let overall = if !overall_rates.is_empty() {
        Some(mean_rate(&overall_rates))
    } else if present_years.len() >= 2 {
        Some(GrowthRate::Undefined)
    } else {
        None
    };

    (growth, overall)
}

fn mean_rate(rates: &[f64]) -> GrowthRate {
    if rates.is_empty() {
        GrowthRate::Undefined
    } else {
        GrowthRate::Defined(rates.iter().sum::<f64>() / rates.len() as f64)
    }
}

/// Order ranking units by the metric's latest in-range value, ties
/// broken by PSU id ascending so reruns are identical.
fn build_ranking(targets: &[TargetAnalysis], request: &AnalysisRequest) -> Ranking {
    let metric = request.metrics.first().copied().unwrap_or(Metric::Revenue);

    let mut entries = Vec::new();
    let mut no_data = Vec::new();
    for analysis in targets {
        let psu_id = match analysis.target {
            Target::Psu(id) => id,
            Target::Sector(_) => continue,
        };
        match analysis.series_for(metric).and_then(|s| s.latest_value()) {
            Some((year, value)) => entries.push(RankEntry {
                psu_id,
                name: analysis.name.clone(),
                year,
                value,
            }),
            None => no_data.push(analysis.name.clone()),
        }
    }

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.psu_id.cmp(&b.psu_id))
    });
    if let Some(limit) = request.limit {
        entries.truncate(limit);
    }

    Ranking {
        metric,
        entries,
        no_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputStyle;
    use crate::store::tests::{record, sample_store};
    use crate::store::{DataStore, Dataset};

    fn request(intent: Intent, targets: Vec<Target>, years: YearRange) -> AnalysisRequest {
        AnalysisRequest {
            intent,
            targets,
            years,
            metrics: vec![Metric::Revenue],
            style: OutputStyle::Bullet,
            with_recommendations: false,
            limit: None,
        }
    }

    #[test]
    fn test_trend_growth_is_exact() {
        let store = sample_store();
        let req = request(Intent::Trend, vec![Target::Psu(1)], YearRange::new(2020, 2022));
        let result = analyze(&req, &store).unwrap();

        let series = result.targets[0].series_for(Metric::Revenue).unwrap();
        // 100 (2020) -> 150 (2022): one segment of exactly 50%
        assert_eq!(series.growth.len(), 1);
        assert_eq!(series.growth[0].from, 2020);
        assert_eq!(series.growth[0].to, 2022);
        assert_eq!(series.growth[0].rate, GrowthRate::Defined(0.5));
        assert_eq!(series.overall, Some(GrowthRate::Defined(0.5)));
    }

    #[test]
    fn test_missing_years_are_flagged_never_interpolated() {
        let store = sample_store();
        // PSU-3 has records for 2020 and 2023 only
        let req = request(Intent::Trend, vec![Target::Psu(3)], YearRange::new(2020, 2024));
        let result = analyze(&req, &store).unwrap();

        let series = result.targets[0].series_for(Metric::Revenue).unwrap();
        assert_eq!(series.points.len(), 5);
        assert_eq!(series.missing_years(), vec![2021, 2022, 2024]);
        assert_eq!(series.growth.len(), 1);
        assert_eq!(series.growth[0].from, 2020);
        assert_eq!(series.growth[0].to, 2023);
        assert_eq!(series.growth[0].rate, GrowthRate::Defined(0.5));
    }

    #[test]
    fn test_zero_base_growth_is_undefined() {
        let store = DataStore::new(Dataset {
            sectors: vec![crate::models::Sector {
                id: 1,
                name: "Energy".to_string(),
                description: String::new(),
            }],
            psus: vec![crate::models::Psu {
                id: 1,
                name: "PSU-1".to_string(),
                sector_id: 1,
                location: "Delhi".to_string(),
                established_year: 1970,
            }],
            records: vec![record(1, 2020, 0.0, 0.0), record(1, 2021, 50.0, 1.0)],
            kpis: vec![],
        })
        .unwrap();

        let req = request(Intent::Trend, vec![Target::Psu(1)], YearRange::new(2020, 2021));
        let result = analyze(&req, &store).unwrap();

        let series = result.targets[0].series_for(Metric::Revenue).unwrap();
        assert_eq!(series.growth[0].rate, GrowthRate::Undefined);
        assert_eq!(series.overall, Some(GrowthRate::Undefined));
    }

    #[test]
    fn test_comparison_aligns_on_common_year_axis() {
        let store = sample_store();
        let req = request(
            Intent::Comparison,
            vec![Target::Psu(1), Target::Psu(3)],
            YearRange::new(2020, 2023),
        );
        let result = analyze(&req, &store).unwrap();

        assert_eq!(result.targets.len(), 2);
        for target in &result.targets {
            let series = target.series_for(Metric::Revenue).unwrap();
            assert_eq!(series.points.len(), 4);
            assert_eq!(series.points[0].year, 2020);
        }
        let psu1 = result.targets[0].series_for(Metric::Revenue).unwrap();
        assert_eq!(psu1.missing_years(), vec![2021, 2023]);
    }

    #[test]
    fn test_sector_trend_is_mean_of_member_growth() {
        let store = sample_store();
        let req = request(Intent::Trend, vec![Target::Sector(1)], YearRange::new(2020, 2022));
        let result = analyze(&req, &store).unwrap();

        let series = result.targets[0].series_for(Metric::Revenue).unwrap();
        // 2020 mean(100, 200) = 150; 2021 only PSU-2 = 210; 2022 mean(150, 220) = 185
        assert_eq!(series.points[0].value, Some(150.0));
        assert_eq!(series.points[1].value, Some(210.0));
        assert_eq!(series.points[2].value, Some(185.0));

        // overall: mean of PSU-1 (0.5) and PSU-2 (0.1) first-to-last growth
        match series.overall {
            Some(GrowthRate::Defined(rate)) => assert!((rate - 0.3).abs() < 1e-9),
            other => panic!("expected defined sector growth, got {:?}", other),
        }
    }

    #[test]
    fn test_ranking_orders_by_latest_value_with_id_tiebreak() {
        let store = sample_store();
        let req = request(Intent::Ranking, vec![], YearRange::new(2020, 2022));
        let result = analyze(&req, &store).unwrap();

        let ranking = result.ranking.unwrap();
        let order: Vec<_> = ranking.entries.iter().map(|e| e.name.as_str()).collect();
        // latest in-range values: PSU-2 220 (2022), PSU-1 150 (2022), PSU-3 80 (2020)
        assert_eq!(order, vec!["PSU-2", "PSU-1", "PSU-3"]);
        assert_eq!(ranking.entries[2].year, 2020);
    }

    #[test]
    fn test_ranking_is_deterministic_across_reruns() {
        let store = sample_store();
        let req = request(Intent::Ranking, vec![Target::Sector(1)], YearRange::new(2020, 2022));

        let first = analyze(&req, &store).unwrap();
        let second = analyze(&req, &store).unwrap();

        let names = |r: &AnalysisResult| {
            r.ranking
                .as_ref()
                .unwrap()
                .entries
                .iter()
                .map(|e| e.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_ranking_ties_break_by_psu_id() {
        let store = DataStore::new(Dataset {
            sectors: vec![crate::models::Sector {
                id: 1,
                name: "Energy".to_string(),
                description: String::new(),
            }],
            psus: (1..=3)
                .map(|id| crate::models::Psu {
                    id,
                    name: format!("PSU-{}", id),
                    sector_id: 1,
                    location: "Delhi".to_string(),
                    established_year: 1970,
                })
                .collect(),
            records: vec![
                record(2, 2022, 100.0, 1.0),
                record(1, 2022, 100.0, 1.0),
                record(3, 2022, 100.0, 1.0),
            ],
            kpis: vec![],
        })
        .unwrap();

        let req = request(Intent::Ranking, vec![], YearRange::single(2022));
        let ranking = analyze(&req, &store).unwrap().ranking.unwrap();
        let ids: Vec<_> = ranking.entries.iter().map(|e| e.psu_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ranking_reports_no_data_targets() {
        let store = sample_store();
        // 2023: only PSU-3 has a record
        let req = request(Intent::Ranking, vec![], YearRange::single(2023));
        let ranking = analyze(&req, &store).unwrap().ranking.unwrap();

        assert_eq!(ranking.entries.len(), 1);
        assert_eq!(ranking.entries[0].name, "PSU-3");
        assert_eq!(ranking.no_data, vec!["PSU-1", "PSU-2"]);
    }

    #[test]
    fn test_trend_with_one_year_of_data_is_insufficient() {
        let store = sample_store();
        let req = request(Intent::Trend, vec![Target::Psu(3)], YearRange::single(2023));
        let err = analyze(&req, &store).unwrap_err();

        match err {
            QueryError::InsufficientData {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_bounds_year_range_fails() {
        let store = sample_store();
        let req = request(Intent::Trend, vec![Target::Psu(1)], YearRange::new(2030, 2031));
        assert!(matches!(
            analyze(&req, &store),
            Err(QueryError::YearRangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_overview_counts_latest_year() {
        let store = sample_store();
        let summary = overview(&store).unwrap();

        assert_eq!(summary.psu_count, 3);
        assert_eq!(summary.sector_count, 2);
        assert_eq!((summary.year_min, summary.year_max), (2020, 2023));
        // only PSU-3 has a 2023 record
        assert_eq!(summary.total_revenue_latest, 120.0);
        assert_eq!(summary.profitable_psus, 1);
        assert_eq!(summary.loss_making_psus, 0);
    }
}
