//! Historical hurricane catalog and the statistics derived from it
//!
//! The catalog is a CSV with one row per storm that affected the island:
//!
//! ```text
//! Year,PR Wind Speed,Max Category
//! 1899,45.0,H3
//! ```
//!
//! From it we derive the annual occurrence rates (overall and per Saffir-Simpson
//! category), the log-normal fit of peak wind speed and the per-year counts.

use crate::error::{GridHazardError, Result};
use crate::hazard::HazardGenerator;
use crate::stats::fit_lognormal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub const CATEGORIES: [&str; 6] = ["TS", "H1", "H2", "H3", "H4", "H5"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HurricaneRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    /// Peak wind speed over the island in m/s
    #[serde(rename = "PR Wind Speed")]
    pub wind_speed: f64,
    #[serde(rename = "Max Category")]
    pub max_category: String,
}

/// Occurrences per year, overall and by category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRates {
    pub global: f64,
    pub by_category: BTreeMap<String, f64>,
    pub tropical_storm_and_h1: f64,
    pub h2_and_h3: f64,
    pub h4_and_h5: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HurricaneCatalog {
    records: Vec<HurricaneRecord>,
}

impl HurricaneCatalog {
    pub fn new(records: Vec<HurricaneRecord>) -> Self {
        HurricaneCatalog { records }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            GridHazardError::MissingInput(format!("hurricane catalog {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let records = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<HurricaneRecord>, _>>()?;
        if records.is_empty() {
            return Err(GridHazardError::MissingInput(
                "hurricane catalog has no rows".to_string(),
            ));
        }
        Ok(HurricaneCatalog { records })
    }

    pub fn records(&self) -> &[HurricaneRecord] {
        &self.records
    }

    /// Years between the first and last recorded storm
    pub fn span_years(&self) -> Result<f64> {
        let first = self.records.iter().map(|r| r.year).min();
        let last = self.records.iter().map(|r| r.year).max();
        match (first, last) {
            (Some(first), Some(last)) if last > first => Ok((last - first) as f64),
            _ => Err(GridHazardError::invalid(
                "hurricane catalog must span more than one year",
            )),
        }
    }

    pub fn rates(&self) -> Result<CatalogRates> {
        let span = self.span_years()?;
        let mut by_category = BTreeMap::new();
        for category in CATEGORIES {
            let count = self
                .records
                .iter()
                .filter(|r| r.max_category.trim() == category)
                .count();
            by_category.insert(category.to_string(), count as f64 / span);
        }
        let rate = |c: &str| by_category.get(c).copied().unwrap_or(0.0);

        Ok(CatalogRates {
            global: self.records.len() as f64 / span,
            tropical_storm_and_h1: rate("TS") + rate("H1"),
            h2_and_h3: rate("H2") + rate("H3"),
            h4_and_h5: rate("H4") + rate("H5"),
            by_category,
        })
    }

    /// Log-normal `(mu, sigma)` of the recorded peak wind speeds
    pub fn fit_wind_speed(&self) -> Result<(f64, f64)> {
        let speeds: Vec<f64> = self.records.iter().map(|r| r.wind_speed).collect();
        fit_lognormal(&speeds)
    }

    /// Number of storms in each year of `start..=end`
    pub fn annual_occurrences(&self, start: i32, end: i32) -> Vec<(i32, usize)> {
        (start..=end)
            .map(|year| (year, self.records.iter().filter(|r| r.year == year).count()))
            .collect()
    }

    /// Empirical probability of seeing `n` storms in a year, keyed by `n`
    pub fn occurrence_count_pmf(&self, start: i32, end: i32) -> BTreeMap<usize, f64> {
        let annual = self.annual_occurrences(start, end);
        let mut pmf = BTreeMap::new();
        for (_, count) in &annual {
            *pmf.entry(*count).or_insert(0.0) += 1.0;
        }
        let years = annual.len().max(1) as f64;
        for p in pmf.values_mut() {
            *p /= years;
        }
        pmf
    }

    /// Poisson hazard model fitted to the catalog (global rate, log-normal winds)
    pub fn hazard_generator(&self) -> Result<HazardGenerator> {
        let rates = self.rates()?;
        let (mu, sigma) = self.fit_wind_speed()?;
        Ok(HazardGenerator::new(rates.global, mu, sigma))
    }
}
