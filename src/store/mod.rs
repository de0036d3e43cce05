//! Read-only data store for sector, PSU and performance data.
//!
//! The store is populated once at startup and never mutated afterwards,
//! so concurrent readers need no synchronization. Lookups either return
//! present records or typed errors; missing years are never synthesized.

pub mod dataset;
pub mod generate;

pub use dataset::{load_dataset, Dataset};
pub use generate::{generate_dataset, GenerateOptions};

use crate::error::{QueryError, Result};
use crate::models::{Kpi, PerformanceRecord, Psu, PsuId, Sector, SectorId, Year, YearRange};
use anyhow::bail;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory accessor over the loaded dataset.
pub struct DataStore {
    sectors: BTreeMap<SectorId, Sector>,
    psus: BTreeMap<PsuId, Psu>,
    by_sector: BTreeMap<SectorId, BTreeSet<PsuId>>,
    records: BTreeMap<(PsuId, Year), PerformanceRecord>,
    kpis: Vec<Kpi>,
}

impl DataStore {
    /// Build a store from a dataset, validating referential integrity:
    /// every PSU must reference an existing sector, every record an
    /// existing PSU, and (psu, year) keys must be unique.
    pub fn new(dataset: Dataset) -> anyhow::Result<Self> {
        let mut sectors = BTreeMap::new();
        for sector in dataset.sectors {
            if sectors.insert(sector.id, sector).is_some() {
                bail!("duplicate sector id in dataset");
            }
        }

        let mut psus = BTreeMap::new();
        let mut by_sector: BTreeMap<SectorId, BTreeSet<PsuId>> =
            sectors.keys().map(|&id| (id, BTreeSet::new())).collect();
        for psu in dataset.psus {
            if !sectors.contains_key(&psu.sector_id) {
                bail!(
                    "PSU '{}' references unknown sector id {}",
                    psu.name,
                    psu.sector_id
                );
            }
            by_sector
                .entry(psu.sector_id)
                .or_default()
                .insert(psu.id);
            if psus.insert(psu.id, psu).is_some() {
                bail!("duplicate PSU id in dataset");
            }
        }

        let mut records = BTreeMap::new();
        for record in dataset.records {
            if !psus.contains_key(&record.psu_id) {
                bail!(
                    "performance record for year {} references unknown PSU id {}",
                    record.year,
                    record.psu_id
                );
            }
            let key = (record.psu_id, record.year);
            if records.insert(key, record).is_some() {
                bail!(
                    "duplicate performance record for PSU id {} year {}",
                    key.0,
                    key.1
                );
            }
        }

        Ok(Self {
            sectors,
            psus,
            by_sector,
            records,
            kpis: dataset.kpis,
        })
    }

    pub fn sectors(&self) -> &BTreeMap<SectorId, Sector> {
        &self.sectors
    }

    pub fn psus(&self) -> &BTreeMap<PsuId, Psu> {
        &self.psus
    }

    pub fn kpis(&self) -> &[Kpi] {
        &self.kpis
    }

    pub fn sector(&self, id: SectorId) -> Result<&Sector> {
        self.sectors.get(&id).ok_or(QueryError::NotFound {
            kind: "sector",
            name: id.to_string(),
        })
    }

    pub fn psu(&self, id: PsuId) -> Result<&Psu> {
        self.psus.get(&id).ok_or(QueryError::NotFound {
            kind: "PSU",
            name: id.to_string(),
        })
    }

    /// Ids of all PSUs belonging to a sector, ordered.
    pub fn psus_in_sector(&self, id: SectorId) -> Result<&BTreeSet<PsuId>> {
        self.by_sector.get(&id).ok_or(QueryError::NotFound {
            kind: "sector",
            name: id.to_string(),
        })
    }

    /// All present records for one PSU within a year range, ordered by
    /// year. Sparse data stays sparse: absent years are simply absent.
    pub fn psu_records(&self, psu_id: PsuId, years: &YearRange) -> Vec<&PerformanceRecord> {
        self.records
            .range((psu_id, years.start)..=(psu_id, years.end))
            .map(|(_, record)| record)
            .collect()
    }

    /// Present records for a set of PSUs within a year range, ordered by
    /// (psu, year).
    pub fn performance(
        &self,
        psu_ids: &BTreeSet<PsuId>,
        years: &YearRange,
    ) -> Vec<&PerformanceRecord> {
        psu_ids
            .iter()
            .flat_map(|&id| self.psu_records(id, years))
            .collect()
    }

    /// The record for one PSU and year, if present.
    pub fn record(&self, psu_id: PsuId, year: Year) -> Option<&PerformanceRecord> {
        self.records.get(&(psu_id, year))
    }

    /// Min and max year across all records; `None` for an empty store.
    pub fn year_bounds(&self) -> Option<(Year, Year)> {
        let mut years = self.records.keys().map(|&(_, year)| year);
        let first = years.next()?;
        let (min, max) = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some((min, max))
    }

    /// Case-insensitive exact lookup of a sector by name.
    pub fn find_sector_by_name(&self, name: &str) -> Option<&Sector> {
        let wanted = normalize_name(name);
        self.sectors
            .values()
            .find(|s| normalize_name(&s.name) == wanted)
    }

    /// Case-insensitive exact lookup of a PSU by name.
    pub fn find_psu_by_name(&self, name: &str) -> Option<&Psu> {
        let wanted = normalize_name(name);
        self.psus
            .values()
            .find(|p| normalize_name(&p.name) == wanted)
    }
}

/// Lowercase a name and collapse `-`/`_`/whitespace runs to single
/// spaces, so "PSU-1", "psu_1" and "Psu 1" all compare equal.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
