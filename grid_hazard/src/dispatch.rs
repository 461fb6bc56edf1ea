//! Reference capacities/activities from the capacity-expansion solver and
//! their per-realization rebalancing
//!
//! The solver dispatches the system for the mean weather year. Each inner
//! iteration rescales solar and wind output for its sampled weather, lets the
//! marginal technology (nuclear in the decarbonized future, NGCC in business
//! as usual) cover what is left of demand, and scales grid throughput with
//! demand.

use crate::error::{GridHazardError, Result};
use crate::technology::{TechMap, Technology};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Hours per year over MWh per PJ: GW of capacity to PJ per year
const GW_TO_PJ_PER_YEAR: f64 = 365.0 * 24.0 / 277.78;

/// Cost model variant, named after the energy-system pathway it describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVariant {
    /// Nuclear-heavy decarbonized future
    FutureDecarbonized,
    /// Fossil-heavy business as usual
    BusinessAsUsual,
}

impl CostVariant {
    /// Technology that balances demand after renewables
    pub fn marginal(self) -> Technology {
        match self {
            CostVariant::FutureDecarbonized => Technology::Nuclear,
            CostVariant::BusinessAsUsual => Technology::Ngcc,
        }
    }

    /// Short tag used in output file names
    pub fn tag(self) -> &'static str {
        match self {
            CostVariant::FutureDecarbonized => "FD",
            CostVariant::BusinessAsUsual => "BAU",
        }
    }

    /// Technologies whose operational cost share is reported, in column order
    pub fn reported_technologies(self) -> &'static [Technology] {
        match self {
            CostVariant::FutureDecarbonized => &[
                Technology::SolarPv,
                Technology::Wind,
                Technology::Battery,
                Technology::Hydro,
                Technology::Ngcc,
                Technology::Nuclear,
                Technology::Transmission,
                Technology::Distribution,
            ],
            CostVariant::BusinessAsUsual => &[
                Technology::SolarPv,
                Technology::Wind,
                Technology::Battery,
                Technology::Hydro,
                Technology::Biomass,
                Technology::Ngcc,
                Technology::Coal,
                Technology::Diesel,
                Technology::Oil,
                Technology::Nuclear,
                Technology::Transmission,
                Technology::Distribution,
            ],
        }
    }
}

impl fmt::Display for CostVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchParams {
    /// Upper bound on the weather-driven solar and wind change ratios
    pub max_change_ratio: f64,
    /// Cost multiplier on marginal dispatch above the plant's maximum
    pub over_dispatch_premium: f64,
    /// PJ of uranium imported per PJ of nuclear output
    pub uranium_per_nuclear: f64,
    /// Maximum capacity factor of the marginal technology, per variant
    pub nuclear_max_capacity_factor: f64,
    pub ngcc_max_capacity_factor: f64,
}

impl Default for DispatchParams {
    fn default() -> Self {
        DispatchParams {
            max_change_ratio: 1.5,
            over_dispatch_premium: 1.2,
            uranium_per_nuclear: 2.91,
            nuclear_max_capacity_factor: 0.94,
            ngcc_max_capacity_factor: 0.87,
        }
    }
}

impl DispatchParams {
    pub fn max_capacity_factor(&self, variant: CostVariant) -> f64 {
        match variant {
            CostVariant::FutureDecarbonized => self.nuclear_max_capacity_factor,
            CostVariant::BusinessAsUsual => self.ngcc_max_capacity_factor,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DispatchRow {
    technology: Technology,
    #[serde(default)]
    capacity: f64,
    #[serde(default)]
    activity: f64,
}

/// Capacities (GW) and activities (PJ) of the solved reference year
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTable {
    pub capacities: TechMap<f64>,
    pub activities: TechMap<f64>,
}

impl DispatchTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            GridHazardError::MissingInput(format!("dispatch table {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    /// CSV with columns `technology,capacity,activity`; missing technologies are zero
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut capacities = TechMap::default();
        let mut activities = TechMap::default();
        for row in csv_reader.deserialize() {
            let row: DispatchRow = row?;
            capacities[row.technology] = row.capacity;
            activities[row.technology] = row.activity;
        }
        Ok(DispatchTable {
            capacities,
            activities,
        })
    }

    /// Copy with every capacity multiplied by `scale` (planning reserve)
    pub fn with_capacity_scale(&self, scale: f64) -> Self {
        let mut scaled = self.clone();
        for tech in Technology::ALL {
            scaled.capacities[tech] *= scale;
        }
        scaled
    }

    /// Highest annual output (PJ) the marginal technology can deliver at its
    /// maximum capacity factor
    pub fn max_marginal_activity(&self, variant: CostVariant, params: &DispatchParams) -> f64 {
        self.capacities[variant.marginal()] * GW_TO_PJ_PER_YEAR * params.max_capacity_factor(variant)
    }
}

/// Activities of one realization
#[derive(Debug, Clone, PartialEq)]
pub struct Rebalanced {
    pub activities: TechMap<f64>,
    /// Blend of normal and premium cost rates for the marginal technology
    pub added_cost_ratio: f64,
    pub solar_change: f64,
    pub wind_change: f64,
}

/// Inputs to [`rebalance`] that vary per realization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchShift {
    pub solar_change: f64,
    pub wind_change: f64,
    /// Annual demand of the scenario (PJ)
    pub demand: f64,
    /// Demand the reference dispatch was solved for (PJ)
    pub demand_mean: f64,
}

/// Cost-rate multiplier when marginal dispatch `activity` exceeds `max_activity`:
/// the excess is charged at `premium`, the rest at the normal rate.
pub fn added_cost_ratio(activity: f64, max_activity: f64, premium: f64) -> f64 {
    if activity > max_activity {
        ((activity - max_activity) / activity) * premium + max_activity / activity
    } else {
        1.0
    }
}

fn clip_change(name: &str, change: f64, max: f64) -> f64 {
    if change > max {
        warn!(ratio = change, max, "{} change ratio clipped", name);
    }
    change.clamp(0.0, max)
}

pub fn rebalance(
    reference: &DispatchTable,
    variant: CostVariant,
    shift: DispatchShift,
    max_marginal_activity: f64,
    params: &DispatchParams,
) -> Result<Rebalanced> {
    if shift.demand_mean.is_nan() || shift.demand_mean <= 0.0 {
        return Err(GridHazardError::invalid(format!(
            "mean demand must be positive, got {}",
            shift.demand_mean
        )));
    }

    let solar_change = clip_change("solar", shift.solar_change, params.max_change_ratio);
    let wind_change = clip_change("wind", shift.wind_change, params.max_change_ratio);

    let mut acts = reference.activities;
    acts[Technology::SolarPv] *= solar_change;
    acts[Technology::Wind] *= wind_change;

    let residual = (shift.demand - acts[Technology::SolarPv] - acts[Technology::Wind]).max(0.0);
    let marginal = variant.marginal();
    match variant {
        CostVariant::FutureDecarbonized => {
            acts[marginal] = residual;
            acts[Technology::ImportUranium] = params.uranium_per_nuclear * residual;
        }
        CostVariant::BusinessAsUsual => {
            let solved = reference.activities[marginal];
            if solved > 0.0 {
                let ratio = residual / solved;
                acts[marginal] *= ratio;
                acts[Technology::ImportNaturalGas] *= ratio;
            } else {
                warn!(
                    technology = %marginal,
                    "reference dispatch has no marginal output, fuel imports set to zero"
                );
                acts[marginal] = residual;
                acts[Technology::ImportNaturalGas] = 0.0;
            }
        }
    }

    let added = added_cost_ratio(
        acts[marginal],
        max_marginal_activity,
        params.over_dispatch_premium,
    );

    let demand_ratio = shift.demand / shift.demand_mean;
    for grid in [
        Technology::Transmission,
        Technology::Substation,
        Technology::Distribution,
        Technology::Tower,
    ] {
        acts[grid] *= demand_ratio;
    }

    Ok(Rebalanced {
        activities: acts,
        added_cost_ratio: added,
        solar_change,
        wind_change,
    })
}
