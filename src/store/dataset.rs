//! Dataset file loading.
//!
//! A dataset is a single JSON document with sector, PSU, performance and
//! KPI tables. The storage mechanism is opaque to the rest of the
//! pipeline; only the read contract of [`crate::store::DataStore`]
//! matters.

use crate::models::{Kpi, PerformanceRecord, Psu, Sector};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The raw tabular dataset before integrity validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub sectors: Vec<Sector>,
    pub psus: Vec<Psu>,
    pub records: Vec<PerformanceRecord>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
}

/// Load a dataset from a JSON file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

    let dataset: Dataset = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset file: {}", path.display()))?;

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_dataset() {
        let json = r#"{
            "sectors": [{"id": 1, "name": "Energy", "description": "Power generation"}],
            "psus": [{"id": 1, "name": "PSU-1", "sector_id": 1,
                      "location": "Delhi", "established_year": 1975}],
            "records": [{"psu_id": 1, "year": 2020, "revenue": 100.0,
                         "profit": 10.0, "assets": 250.0, "employees": 1200.0,
                         "roi": 4.0, "market_share": 12.5}]
        }"#;

        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.sectors.len(), 1);
        assert_eq!(dataset.psus.len(), 1);
        assert_eq!(dataset.records.len(), 1);
        assert!(dataset.kpis.is_empty());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load_dataset(Path::new("/nonexistent/dataset.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset file"));
    }
}
