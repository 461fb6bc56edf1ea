//! Outer-loop scenario: everything that stays fixed across the hazard
//! realizations of one outer iteration

use crate::cost::CostParams;
use crate::dispatch::DispatchTable;
use crate::error::{GridHazardError, Result};
use crate::inventory::{build_components, FleetCounts, GridParams};
use crate::projection::{CostSlot, ProjectedQuantity, ProjectionDraw, ProjectionTable};
use crate::stats::uniform_draw;
use crate::technology::{TechMap, Technology};
use crate::Component;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};

/// Climate-change shift of the hazard: `(LogNormal(mu, sigma) - offset) / 100 + 1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardShift {
    pub mu: f64,
    pub sigma: f64,
    /// Percent change that maps to a multiplier of one
    pub offset: f64,
}

impl HazardShift {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let percent = LogNormal::new(self.mu, self.sigma)
            .map_err(|e| GridHazardError::invalid(format!("hazard shift: {}", e)))?
            .sample(rng);
        Ok((percent - self.offset) / 100.0 + 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Range of the multiplier applied to damage cost and downtime
    pub corruption: (f64, f64),
    /// Gaussian-copula correlation of the electricity price with per-capita
    /// consumption
    pub price_correlation: f64,
    pub intensity_shift: HazardShift,
    pub frequency_shift: HazardShift,
    /// Population × per-capita consumption over this is demand in PJ
    pub demand_divisor: f64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        ScenarioSettings {
            corruption: (1.0, 4.0),
            price_correlation: 0.573,
            intensity_shift: HazardShift {
                mu: 1.6564,
                sigma: 0.5396,
                offset: 2.5,
            },
            frequency_shift: HazardShift {
                mu: 3.9344,
                sigma: 0.4347,
                offset: 65.0,
            },
            demand_divisor: 277.78e6,
        }
    }
}

/// Inputs shared by every scenario of a run
#[derive(Debug, Clone, Copy)]
pub struct ScenarioInputs<'a> {
    pub projections: &'a ProjectionTable,
    pub settings: &'a ScenarioSettings,
    pub costs: &'a CostParams,
    pub grid: &'a GridParams,
    /// Reference dispatch with capacities already scaled
    pub dispatch: &'a DispatchTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParameters {
    pub projections: ProjectionDraw,
    pub population: f64,
    pub per_capita: f64,
    pub electricity_price_change: f64,
    /// PJ per year
    pub demand: f64,
    pub intensity_multiplier: f64,
    pub frequency_multiplier: f64,
    pub corruption: f64,
    pub fixed: TechMap<f64>,
    pub variable: TechMap<f64>,
    pub investment: TechMap<f64>,
    pub fleet: FleetCounts,
    pub components: Vec<Component>,
}

impl ScenarioParameters {
    /// Draw projections, hazard shifts, corruption and fleet sizes, in that order
    pub fn sample<R: Rng + ?Sized>(inputs: &ScenarioInputs<'_>, rng: &mut R) -> Result<Self> {
        let projections = inputs
            .projections
            .sample(inputs.settings.price_correlation, rng)?;
        let population = projections.value(ProjectedQuantity::Population)?;
        let per_capita = projections.value(ProjectedQuantity::PerCapitaConsumption)?;
        let electricity_price_change =
            projections.value(ProjectedQuantity::ElectricityPriceChange)?;

        let intensity_multiplier = inputs.settings.intensity_shift.sample(rng)?;
        let frequency_multiplier = inputs.settings.frequency_shift.sample(rng)?;
        let (lo, hi) = inputs.settings.corruption;
        let corruption = uniform_draw(rng, lo, hi);

        let mut fixed = inputs.costs.fixed;
        let mut variable = inputs.costs.variable;
        let mut investment = inputs.costs.investment;
        for drawn in &projections.values {
            match drawn.quantity.cost_slot() {
                Some(CostSlot::Fixed(tech)) => fixed[tech] = drawn.value,
                Some(CostSlot::Variable(tech)) => variable[tech] = drawn.value,
                Some(CostSlot::Investment(tech)) => investment[tech] = drawn.value,
                None => {}
            }
        }

        let capacities = &inputs.dispatch.capacities;
        let fleet = FleetCounts::sample(capacities, inputs.grid, rng);
        let components = build_components(
            capacities,
            investment[Technology::SolarPv],
            investment[Technology::Wind],
            inputs.grid,
        );

        Ok(ScenarioParameters {
            demand: population * per_capita / inputs.settings.demand_divisor,
            projections,
            population,
            per_capita,
            electricity_price_change,
            intensity_multiplier,
            frequency_multiplier,
            corruption,
            fixed,
            variable,
            investment,
            fleet,
            components,
        })
    }

    /// Input-matrix row: percentiles of the independently drawn projections
    /// in table order, intensity and frequency multipliers, electricity price
    /// percentile, corruption
    pub fn input_row(&self) -> Vec<f64> {
        let mut row: Vec<f64> = self
            .projections
            .values
            .iter()
            .filter(|v| v.quantity != ProjectedQuantity::ElectricityPriceChange)
            .map(|v| v.percentile)
            .collect();
        row.push(self.intensity_multiplier);
        row.push(self.frequency_multiplier);
        row.push(
            self.projections
                .get(ProjectedQuantity::ElectricityPriceChange)
                .map(|v| v.percentile)
                .unwrap_or(f64::NAN),
        );
        row.push(self.corruption);
        row
    }

    /// Names of the [`input_row`](Self::input_row) columns for `table`
    pub fn input_column_names(table: &ProjectionTable) -> Vec<String> {
        let mut names: Vec<String> = table
            .independent()
            .map(|p| format!("{}_percentile", p.quantity))
            .collect();
        names.push("intensity_multiplier".to_string());
        names.push("frequency_multiplier".to_string());
        names.push("electricity_price_change_percentile".to_string());
        names.push("corruption".to_string());
        names
    }
}
