//! Synthetic dataset generation.
//!
//! Produces a deterministic dataset from a seed so the tool is usable
//! without a real data file. Sector roster and metric shapes follow the
//! ministry's published PSU tables.

use crate::models::{Kpi, PerformanceRecord, Psu, Sector, Year};
use crate::store::dataset::Dataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SECTORS: &[(&str, &str)] = &[
    ("Energy", "Power generation and distribution undertakings"),
    ("Manufacturing", "Heavy industry and capital goods undertakings"),
    ("Mining", "Mineral extraction and processing undertakings"),
    ("Transportation", "Rail, shipping and logistics undertakings"),
    ("Telecom", "Telecommunication service undertakings"),
];

const LOCATIONS: &[&str] = &[
    "New Delhi",
    "Mumbai",
    "Kolkata",
    "Chennai",
    "Bengaluru",
    "Hyderabad",
    "Bhopal",
    "Ranchi",
];

/// Knobs for the generator.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub psu_count: usize,
    pub start_year: Year,
    pub end_year: Year,
    pub seed: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            psu_count: 20,
            start_year: 2020,
            end_year: 2024,
            seed: 42,
        }
    }
}

/// Generate a dataset. Deterministic for a fixed set of options.
pub fn generate_dataset(options: &GenerateOptions) -> Dataset {
    let mut rng = StdRng::seed_from_u64(options.seed);

    let sectors: Vec<Sector> = SECTORS
        .iter()
        .enumerate()
        .map(|(idx, (name, description))| Sector {
            id: idx as u32 + 1,
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();

    let mut psus = Vec::with_capacity(options.psu_count);
    let mut records = Vec::new();

    for i in 0..options.psu_count {
        let id = i as u32 + 1;
        let sector_id = rng.random_range(1..=sectors.len() as u32);
        let location = LOCATIONS[rng.random_range(0..LOCATIONS.len())];

        psus.push(Psu {
            id,
            name: format!("PSU-{}", id),
            sector_id,
            location: location.to_string(),
            established_year: rng.random_range(1950..=2005),
        });

        // Base financials with a per-PSU trend factor, as in the source
        // tables: large units dominate revenue, margins drift slowly.
        let base_revenue = rng.random_range(100.0..10_000.0_f64);
        let base_margin = rng.random_range(-0.05..0.25_f64);
        let trend = rng.random_range(-0.10..0.15_f64);
        let base_employees = rng.random_range(500.0..20_000.0_f64);
        let base_share = rng.random_range(2.0..30.0_f64);

        for (year_idx, year) in (options.start_year..=options.end_year).enumerate() {
            let jitter = rng.random_range(-0.05..0.05);
            let revenue = base_revenue * (1.0 + trend + jitter).powi(year_idx as i32);
            let margin = (base_margin + trend * year_idx as f64 / 5.0).clamp(-0.20, 0.35);
            let profit = revenue * margin;
            let assets = revenue * rng.random_range(1.5..3.0);
            let employees = (base_employees * (1.0 + jitter / 2.0)).round();
            let roi = if assets > 0.0 { profit / assets * 100.0 } else { 0.0 };
            let market_share = (base_share + trend * year_idx as f64 * 2.0).clamp(0.0, 100.0);

            records.push(PerformanceRecord {
                psu_id: id,
                year,
                revenue: round2(revenue),
                profit: round2(profit),
                assets: round2(assets),
                employees,
                roi: round2(roi),
                market_share: round2(market_share),
            });
        }
    }

    let kpis = vec![
        Kpi {
            id: 1,
            name: "Revenue growth".to_string(),
            description: "Year-over-year revenue change".to_string(),
            unit: "%".to_string(),
            sector_id: None,
        },
        Kpi {
            id: 2,
            name: "Return on investment".to_string(),
            description: "Net profit relative to total assets".to_string(),
            unit: "%".to_string(),
            sector_id: None,
        },
        Kpi {
            id: 3,
            name: "Market share".to_string(),
            description: "Share of sector revenue held by the unit".to_string(),
            unit: "%".to_string(),
            sector_id: None,
        },
    ];

    Dataset {
        sectors,
        psus,
        records,
        kpis,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
