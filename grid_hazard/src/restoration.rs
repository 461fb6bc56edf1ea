//! Repair-time model
//!
//! After each hurricane a pool of repair teams, sized by the peak wind speed,
//! works through the repair days of every damaged component. The outage
//! lasts `Σ repair days / teams`, capped at one year.

use crate::inventory::FleetCounts;
use crate::stats::{normal_draw, uniform_draw};
use crate::{Component, ComponentType, DAYS_PER_YEAR};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Team-count range mobilized when the wind speed exceeds `min_wind_speed`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamBand {
    pub min_wind_speed: f64,
    pub teams: (f64, f64),
}

/// Repair-days `(mean, std)` for each failure-severity bucket
pub type SeverityDays = [(f64, f64); 4];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationParams {
    /// Bands checked from the first; the first band the wind speed exceeds wins
    pub team_bands: Vec<TeamBand>,
    /// Teams when no band is exceeded
    pub calm_teams: (f64, f64),
    /// Metres between distribution poles
    pub pole_spacing: (f64, f64),
    pub days_per_pole: f64,
    /// Days per km of transmission line
    pub transmission_days_per_km: f64,
    /// Relative standard deviation of line repair days
    pub line_jitter: f64,
    /// Days per tower: `Normal(mean, std)` clipped to `bounds`
    pub tower_days: (f64, f64),
    pub tower_day_bounds: (f64, f64),
    /// Upper bounds of the failure-probability buckets
    pub severity_bounds: [f64; 4],
    pub substation_days: SeverityDays,
    pub generator_days: SeverityDays,
    pub max_period_days: f64,
}

impl Default for RestorationParams {
    fn default() -> Self {
        RestorationParams {
            team_bands: vec![
                TeamBand {
                    min_wind_speed: 58.0,
                    teams: (300.0, 350.0),
                },
                TeamBand {
                    min_wind_speed: 43.0,
                    teams: (150.0, 300.0),
                },
                TeamBand {
                    min_wind_speed: 32.0,
                    teams: (100.0, 150.0),
                },
            ],
            calm_teams: (50.0, 100.0),
            pole_spacing: (50.0, 100.0),
            days_per_pole: 0.125,
            transmission_days_per_km: 2.0,
            line_jitter: 0.2,
            tower_days: (2.0, 1.0),
            tower_day_bounds: (1.0, 4.0),
            severity_bounds: [0.05, 0.11, 0.55, 1.0],
            substation_days: [(1.0, 0.5), (3.0, 1.5), (7.0, 3.5), (30.0, 15.0)],
            generator_days: [(5.0, 0.1), (3.6, 3.6), (22.0, 21.0), (65.0, 30.0)],
            max_period_days: DAYS_PER_YEAR,
        }
    }
}

impl RestorationParams {
    pub fn team_range(&self, wind_speed: f64) -> (f64, f64) {
        self.team_bands
            .iter()
            .find(|band| wind_speed > band.min_wind_speed)
            .map(|band| band.teams)
            .unwrap_or(self.calm_teams)
    }

    /// Bucket of `p`; probabilities above the last bound fall in the last bucket
    pub fn severity(&self, p: f64) -> usize {
        self.severity_bounds
            .iter()
            .position(|bound| p <= *bound)
            .unwrap_or(self.severity_bounds.len() - 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestorationOutcome {
    /// Days until service is restored
    pub repair_period: f64,
    pub teams: f64,
    /// Repair days per component, zero where `p == 0`
    pub component_days: Vec<f64>,
}

/// Repair period for one occurrence.
///
/// Draws the team count first, then the repair days of every component with a
/// positive failure probability, in component order.
pub fn compute_restoration<R: Rng + ?Sized>(
    components: &[Component],
    failure_probabilities: &[f64],
    wind_speed: f64,
    fleet: &FleetCounts,
    params: &RestorationParams,
    rng: &mut R,
) -> RestorationOutcome {
    let (lo, hi) = params.team_range(wind_speed);
    let teams = uniform_draw(rng, lo, hi);

    let mut component_days = vec![0.0; components.len()];
    for ((component, &p), days) in components
        .iter()
        .zip(failure_probabilities)
        .zip(component_days.iter_mut())
    {
        if p > 0.0 {
            *days = repair_days(component, p, fleet, params, rng);
        }
    }

    let total: f64 = component_days.iter().sum();
    let repair_period = if teams > 0.0 {
        (total / teams).min(params.max_period_days)
    } else {
        params.max_period_days
    };

    RestorationOutcome {
        repair_period,
        teams,
        component_days,
    }
}

fn repair_days<R: Rng + ?Sized>(
    component: &Component,
    p: f64,
    fleet: &FleetCounts,
    params: &RestorationParams,
    rng: &mut R,
) -> f64 {
    let length = component.line_length.unwrap_or(0.0);
    match component.component_type {
        ComponentType::DistributionLine => {
            let (lo, hi) = params.pole_spacing;
            let poles = (length / uniform_draw(rng, lo, hi)).floor();
            let base = length / 1000.0 + params.days_per_pole * poles;
            jittered(base, params.line_jitter, rng) * p
        }
        ComponentType::TransmissionLine => {
            let base = params.transmission_days_per_km * length / 1000.0;
            jittered(base, params.line_jitter, rng) * p
        }
        ComponentType::Tower => {
            let (mean, std) = params.tower_days;
            let (lo, hi) = params.tower_day_bounds;
            normal_draw(rng, mean, std).clamp(lo, hi) * fleet.towers * p
        }
        ComponentType::Substation => {
            severity_days(&params.substation_days, params.severity(p), rng) * fleet.substations
        }
        ComponentType::SolarGenerator => {
            severity_days(&params.generator_days, params.severity(p), rng) * fleet.solar_farms
        }
        ComponentType::WindGenerator => {
            severity_days(&params.generator_days, params.severity(p), rng) * fleet.wind_farms
        }
    }
}

fn jittered<R: Rng + ?Sized>(base: f64, jitter: f64, rng: &mut R) -> f64 {
    normal_draw(rng, base, jitter * base).max(0.0)
}

/// Repair days of one unit, floored at a third of the bucket mean
fn severity_days<R: Rng + ?Sized>(days: &SeverityDays, bucket: usize, rng: &mut R) -> f64 {
    let (mean, std) = days[bucket];
    normal_draw(rng, mean, std).max(mean / 3.0)
}
