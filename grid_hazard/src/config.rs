//! Experiment configuration
//!
//! An experiment is one TOML file. Only `[experiment]` and `[inputs]` are
//! required; every other section falls back to the published parameters:
//!
//! ```toml
//! [experiment]
//! name = "fd_baseline"
//! variant = "future_decarbonized"
//! outer_iterations = 200
//! inner_iterations = 1000
//!
//! [inputs]
//! catalog = "../data/hurricane_catalog.csv"
//! projections = "../data/projections_2050.csv"
//! dispatch = "../data/dispatch_fd.csv"
//! demand_mean = 58.4
//! ```
//!
//! Relative input paths and the output directory are resolved against the
//! directory holding the TOML file.

use crate::cost::{CostParams, OutageParams};
use crate::dispatch::{CostVariant, DispatchParams};
use crate::error::{GridHazardError, Result};
use crate::fragility::FragilitySet;
use crate::hazard::HazardGenerator;
use crate::inventory::GridParams;
use crate::restoration::RestorationParams;
use crate::scenario::ScenarioSettings;
use crate::weather::WeatherParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentSettings,
    pub inputs: InputPaths,
    #[serde(default)]
    pub hazard: HazardOverrides,
    #[serde(default)]
    pub costs: CostParams,
    #[serde(default)]
    pub grid: GridParams,
    #[serde(default)]
    pub restoration: RestorationParams,
    #[serde(default)]
    pub outage: OutageParams,
    #[serde(default)]
    pub dispatch: DispatchParams,
    #[serde(default)]
    pub weather: WeatherParams,
    #[serde(default)]
    pub scenario: ScenarioSettings,
    #[serde(default)]
    pub fragility: FragilitySet,
}

fn default_outer() -> usize {
    200
}

fn default_inner() -> usize {
    1000
}

fn default_seed() -> u64 {
    1234
}

fn default_min_year() -> f64 {
    2049.0
}

fn default_max_year() -> f64 {
    2050.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_capacity_scale() -> f64 {
    1.2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSettings {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub variant: CostVariant,
    #[serde(default = "default_outer")]
    pub outer_iterations: usize,
    #[serde(default = "default_inner")]
    pub inner_iterations: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Hazard window `[min_year, max_year)`
    #[serde(default = "default_min_year")]
    pub min_year: f64,
    #[serde(default = "default_max_year")]
    pub max_year: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Suffix of the output file names, the variant tag when absent
    #[serde(default)]
    pub tag: Option<String>,
    /// Worker threads for the outer loop; sequential when absent
    #[serde(default)]
    pub threads: Option<usize>,
    /// Planning reserve applied to the solved capacities
    #[serde(default = "default_capacity_scale")]
    pub capacity_scale: f64,
}

/// Data files produced outside the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    pub catalog: PathBuf,
    pub projections: PathBuf,
    pub dispatch: PathBuf,
    /// Demand (PJ) the reference dispatch was solved for
    pub demand_mean: f64,
}

/// Replace the catalog-fitted hazard parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardOverrides {
    pub base_rate: Option<f64>,
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
}

impl HazardOverrides {
    pub fn apply(&self, fitted: HazardGenerator) -> HazardGenerator {
        HazardGenerator::new(
            self.base_rate.unwrap_or(fitted.base_rate),
            self.mu.unwrap_or(fitted.mu),
            self.sigma.unwrap_or(fitted.sigma),
        )
    }
}

impl ExperimentConfig {
    /// Published parameters with the given inputs and loop sizes of the
    /// reference study
    pub fn baseline(name: impl Into<String>, variant: CostVariant, inputs: InputPaths) -> Self {
        ExperimentConfig {
            experiment: ExperimentSettings {
                name: name.into(),
                description: String::new(),
                variant,
                outer_iterations: default_outer(),
                inner_iterations: default_inner(),
                seed: default_seed(),
                min_year: default_min_year(),
                max_year: default_max_year(),
                output_dir: default_output_dir(),
                tag: None,
                threads: None,
                capacity_scale: default_capacity_scale(),
            },
            inputs,
            hazard: HazardOverrides::default(),
            costs: CostParams::default(),
            grid: GridParams::default(),
            restoration: RestorationParams::default(),
            outage: OutageParams::default(),
            dispatch: DispatchParams::default(),
            weather: WeatherParams::default(),
            scenario: ScenarioSettings::default(),
            fragility: FragilitySet::baseline(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GridHazardError::MissingInput(format!("config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.catalog);
        resolve(&mut self.inputs.projections);
        resolve(&mut self.inputs.dispatch);
        resolve(&mut self.experiment.output_dir);
    }

    pub fn tag(&self) -> &str {
        self.experiment
            .tag
            .as_deref()
            .unwrap_or_else(|| self.experiment.variant.tag())
    }

    pub fn validate(&self) -> Result<()> {
        let exp = &self.experiment;
        if exp.outer_iterations == 0 || exp.inner_iterations == 0 {
            return Err(GridHazardError::invalid(
                "outer_iterations and inner_iterations must be at least 1",
            ));
        }
        if exp.threads == Some(0) {
            return Err(GridHazardError::invalid("threads must be at least 1"));
        }
        if !exp.min_year.is_finite() || !exp.max_year.is_finite() {
            return Err(GridHazardError::invalid("simulation years must be finite"));
        }
        if exp.capacity_scale.is_nan() || exp.capacity_scale <= 0.0 {
            return Err(GridHazardError::invalid(format!(
                "capacity_scale must be positive, got {}",
                exp.capacity_scale
            )));
        }
        if self.inputs.demand_mean.is_nan() || self.inputs.demand_mean <= 0.0 {
            return Err(GridHazardError::invalid(format!(
                "demand_mean must be positive, got {}",
                self.inputs.demand_mean
            )));
        }
        let (lo, hi) = self.scenario.corruption;
        if lo.is_nan() || hi.is_nan() || lo > hi || lo < 0.0 {
            return Err(GridHazardError::invalid(format!(
                "corruption range ({}, {}) is not a valid range",
                lo, hi
            )));
        }
        if self.fragility.coefficient_of_variation < 0.0 {
            return Err(GridHazardError::invalid(
                "fragility coefficient_of_variation must not be negative",
            ));
        }
        if self.costs.replacement_cv < 0.0 {
            return Err(GridHazardError::invalid(
                "replacement_cv must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [experiment]
        name = "smoke"
        variant = "business_as_usual"

        [inputs]
        catalog = "data/catalog.csv"
        projections = "data/projections.csv"
        dispatch = "/abs/dispatch.csv"
        demand_mean = 58.4
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ExperimentConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.experiment.outer_iterations, 200);
        assert_eq!(config.experiment.inner_iterations, 1000);
        assert_eq!(config.experiment.seed, 1234);
        assert_eq!(config.experiment.variant, CostVariant::BusinessAsUsual);
        assert_eq!(config.tag(), "BAU");
        assert_eq!(config.restoration, RestorationParams::default());
        assert_eq!(config.fragility, FragilitySet::baseline());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let text = format!(
            "{}\n[restoration]\nmax_period_days = 180.0\n\n[hazard]\nbase_rate = 0.9\n\n[costs.fixed]\nE_NUCLEAR = 121.0\n",
            MINIMAL
        );
        let config = ExperimentConfig::from_toml(&text).unwrap();
        assert_eq!(config.restoration.max_period_days, 180.0);
        assert_eq!(config.restoration.days_per_pole, 0.125);
        assert_eq!(config.hazard.base_rate, Some(0.9));
        assert_eq!(config.costs.fixed[crate::Technology::Nuclear], 121.0);

        let generator = config.hazard.apply(HazardGenerator::new(0.5, 3.0, 0.3));
        assert_eq!(generator, HazardGenerator::new(0.9, 3.0, 0.3));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let mut config = ExperimentConfig::from_toml(MINIMAL).unwrap();
        config.resolve_paths(Path::new("/runs/exp1"));
        assert_eq!(config.inputs.catalog, PathBuf::from("/runs/exp1/data/catalog.csv"));
        assert_eq!(config.inputs.dispatch, PathBuf::from("/abs/dispatch.csv"));
        assert_eq!(config.experiment.output_dir, PathBuf::from("/runs/exp1/output"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ExperimentConfig::from_toml(MINIMAL).unwrap();
        config.experiment.inner_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::from_toml(MINIMAL).unwrap();
        config.inputs.demand_mean = 0.0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::from_toml(MINIMAL).unwrap();
        config.scenario.corruption = (4.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_variant_is_a_parse_error() {
        let text = MINIMAL.replace("variant = \"business_as_usual\"", "");
        assert!(matches!(
            ExperimentConfig::from_toml(&text),
            Err(GridHazardError::Toml(_))
        ));
    }
}
