//! Wind fragility curves
//!
//! A fragility curve maps peak wind speed (m/s) to the mean probability that a
//! component class fails. The uncertainty around that mean is a fixed
//! coefficient of variation (10% by default) shared by every curve.
//!
//! Curves are plain data so they can be recalibrated from the experiment TOML:
//!
//! ```toml
//! [fragility.tower]
//! kind = "log_normal_cdf"
//! sigma = 0.224
//! median = 82.88
//! ```

use crate::stats::{lognormal_cdf, normal_cdf};
use crate::{ComponentType, MS_TO_MPH};
use serde::{Deserialize, Serialize};

/// Anything that can turn a wind speed into a failure-probability distribution
pub trait FragilityModel {
    /// Mean and standard deviation of the failure probability. The mean may
    /// exceed one for multi-state curves.
    fn failure_mean_std(&self, wind_speed: f64, component_type: ComponentType) -> (f64, f64);
}

/// One limit state of a multi-state curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageState {
    /// Log of the median wind speed (in the curve's units) reaching this state
    pub ln_median: f64,
    pub beta: f64,
    /// Fraction of the asset lost in this state
    pub damage_ratio: f64,
}

/// Parametrized fragility curve. `unit_scale` converts m/s into the units the
/// curve was published in (mph, knots, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragilityCurve {
    /// coefficient · (v·unit)^exponent
    PowerLaw {
        coefficient: f64,
        exponent: f64,
        unit_scale: f64,
    },
    /// coefficient · exp(rate · v·unit)
    Exponential {
        coefficient: f64,
        rate: f64,
        unit_scale: f64,
    },
    /// Log-normal CDF of v·unit with shape `sigma` and median `median`
    LogNormalCdf {
        sigma: f64,
        median: f64,
        #[serde(default = "unit")]
        unit_scale: f64,
    },
    /// r / (1 + r) with r = (v·unit / scale)^shape
    LogLogistic {
        scale: f64,
        shape: f64,
        unit_scale: f64,
    },
    /// Σ damage_ratio · Φ((ln(v·unit) − ln_median) / beta)
    ///
    /// Not a probability: at extreme winds the mean tends to the sum of the
    /// damage ratios (1.15 for the baseline substation). Sampled failure
    /// probabilities are clamped to `[0, 1]` by the damage sampler.
    DamageStates {
        unit_scale: f64,
        states: Vec<DamageState>,
    },
}

fn unit() -> f64 {
    1.0
}

impl FragilityCurve {
    /// Mean failure probability at `wind_speed` (m/s)
    pub fn mean(&self, wind_speed: f64) -> f64 {
        let v = wind_speed.max(0.0);
        match self {
            FragilityCurve::PowerLaw {
                coefficient,
                exponent,
                unit_scale,
            } => coefficient * (v * unit_scale).powf(*exponent),
            FragilityCurve::Exponential {
                coefficient,
                rate,
                unit_scale,
            } => coefficient * (v * unit_scale * rate).exp(),
            FragilityCurve::LogNormalCdf {
                sigma,
                median,
                unit_scale,
            } => lognormal_cdf(v * unit_scale, *sigma, *median),
            FragilityCurve::LogLogistic {
                scale,
                shape,
                unit_scale,
            } => {
                let r = (v * unit_scale / scale).powf(*shape);
                if r.is_infinite() {
                    1.0
                } else {
                    r / (1.0 + r)
                }
            }
            FragilityCurve::DamageStates { unit_scale, states } => {
                let ln_v = (v * unit_scale).ln();
                states
                    .iter()
                    .map(|s| s.damage_ratio * normal_cdf((ln_v - s.ln_median) / s.beta))
                    .sum()
            }
        }
    }
}

/// One curve per component class plus the shared coefficient of variation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragilitySet {
    pub coefficient_of_variation: f64,
    pub transmission_line: FragilityCurve,
    pub distribution_line: FragilityCurve,
    pub tower: FragilityCurve,
    pub substation: FragilityCurve,
    pub solar_generator: FragilityCurve,
    pub wind_generator: FragilityCurve,
}

impl Default for FragilitySet {
    fn default() -> Self {
        Self::baseline()
    }
}

impl FragilitySet {
    /// Published curves for the Puerto Rico grid study
    pub fn baseline() -> Self {
        FragilitySet {
            coefficient_of_variation: 0.1,
            // Watson (2018), hurricane wind fragility of transmission lines
            transmission_line: FragilityCurve::Exponential {
                coefficient: 2e-7,
                rate: 0.0834,
                unit_scale: MS_TO_MPH,
            },
            // Wood pole undergrounding assessment
            distribution_line: FragilityCurve::PowerLaw {
                coefficient: 8e-12,
                exponent: 5.1731,
                unit_scale: MS_TO_MPH,
            },
            tower: FragilityCurve::LogNormalCdf {
                sigma: 0.224,
                median: 82.88,
                unit_scale: 1.0,
            },
            // moderate / severe / collapse limit states
            substation: FragilityCurve::DamageStates {
                unit_scale: MS_TO_MPH,
                states: vec![
                    DamageState {
                        ln_median: 5.068,
                        beta: 0.136,
                        damage_ratio: 0.05,
                    },
                    DamageState {
                        ln_median: 5.204,
                        beta: 0.147,
                        damage_ratio: 0.4,
                    },
                    DamageState {
                        ln_median: 5.523,
                        beta: 0.132,
                        damage_ratio: 0.7,
                    },
                ],
            },
            solar_generator: FragilityCurve::LogNormalCdf {
                sigma: 0.14,
                median: 129.346,
                unit_scale: MS_TO_MPH,
            },
            // offshore turbine catastrophe risk, wind speed in knots
            wind_generator: FragilityCurve::LogLogistic {
                scale: 139.6,
                shape: 18.6,
                unit_scale: 1.944,
            },
        }
    }

    pub fn curve(&self, component_type: ComponentType) -> &FragilityCurve {
        match component_type {
            ComponentType::TransmissionLine => &self.transmission_line,
            ComponentType::DistributionLine => &self.distribution_line,
            ComponentType::Tower => &self.tower,
            ComponentType::Substation => &self.substation,
            ComponentType::SolarGenerator => &self.solar_generator,
            ComponentType::WindGenerator => &self.wind_generator,
        }
    }
}

impl FragilityModel for FragilitySet {
    fn failure_mean_std(&self, wind_speed: f64, component_type: ComponentType) -> (f64, f64) {
        let mean = self.curve(component_type).mean(wind_speed);
        (mean, self.coefficient_of_variation * mean)
    }
}
