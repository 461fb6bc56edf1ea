//! Cost aggregation for one hazard realization
//!
//! Three parts make up the annual cost of the system:
//! - damage: replacement cost of failed components, weighted by their
//!   failure probability and the corruption factor
//! - operational: fixed and variable costs of the dispatch, reduced while
//!   the grid is down
//! - outage: value of the load lost while lines are being repaired

use crate::damage::FailureRecord;
use crate::dispatch::CostVariant;
use crate::error::{GridHazardError, Result};
use crate::stats::normal_draw;
use crate::technology::{TechMap, Technology};
use crate::{Component, ComponentType, Occurrence, DAYS_PER_YEAR, MWH_PER_PJ};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Operational cost of the dispatch with the grid fully available
#[derive(Debug, Clone, PartialEq)]
pub struct OperationalCosts {
    pub total: f64,
    /// Cost attributed to each generator or grid technology; fuel imports are
    /// charged to the generator that burns them
    pub by_technology: TechMap<f64>,
    /// `by_technology / total`, zero when the total is zero
    pub ratios: TechMap<f64>,
}

/// Fixed cost × capacity plus variable cost × activity for every technology.
///
/// `fixed` and `variable` are in millions per unit, so the totals are
/// multiplied by 1e6. The marginal technology's own cost (not its fuel) is
/// multiplied by `added_cost_ratio`.
pub fn operational_costs(
    capacities: &TechMap<f64>,
    activities: &TechMap<f64>,
    fixed: &TechMap<f64>,
    variable: &TechMap<f64>,
    marginal: Technology,
    added_cost_ratio: f64,
) -> OperationalCosts {
    const MILLION: f64 = 1e6;
    let mut by_technology = TechMap::default();
    for tech in Technology::ALL {
        if tech.is_fuel_import() {
            continue;
        }
        let mut cost = fixed[tech] * capacities[tech] + variable[tech] * activities[tech];
        if tech == marginal {
            cost *= added_cost_ratio;
        }
        if let Some(fuel) = tech.fuel() {
            cost += variable[fuel] * activities[fuel];
        }
        by_technology[tech] = cost * MILLION;
    }

    let total: f64 = by_technology.iter().map(|(_, cost)| cost).sum();
    let mut ratios = TechMap::default();
    if total != 0.0 {
        for (tech, cost) in by_technology.iter() {
            ratios[tech] = cost / total;
        }
    }

    OperationalCosts {
        total,
        by_technology,
        ratios,
    }
}

/// Residential, commercial and industrial values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sectors {
    pub residential: f64,
    pub commercial: f64,
    pub industrial: f64,
}

impl Sectors {
    pub fn sum(&self) -> f64 {
        self.residential + self.commercial + self.industrial
    }
}

/// Value-of-lost-load model: `max(intercept + slope × price, 0) × lost load`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutageParams {
    /// Share of the lost load falling on each sector; the residential share
    /// is reduced for rooftop solar
    pub load_shares: Sectors,
    /// Electricity price of each sector (cents/kWh) per unit price change
    pub price_per_change: Sectors,
    pub voll_intercept: Sectors,
    pub voll_slope: Sectors,
    /// Currency conversion applied to the summed VoLL
    pub voll_divisor: f64,
    /// Share of the outage counted as lost (linear recovery)
    pub recovery_factor: f64,
}

impl Default for OutageParams {
    fn default() -> Self {
        OutageParams {
            load_shares: Sectors {
                residential: 0.735,
                commercial: 0.45,
                industrial: 0.11,
            },
            price_per_change: Sectors {
                residential: 15.64,
                commercial: 8.5,
                industrial: 12.5,
            },
            voll_intercept: Sectors {
                residential: -1.0058,
                commercial: -4.585,
                industrial: -1.859,
            },
            voll_slope: Sectors {
                residential: 0.58,
                commercial: 0.991,
                industrial: 0.49,
            },
            voll_divisor: 1.81,
            recovery_factor: 0.5,
        }
    }
}

impl OutageParams {
    /// Value of lost load per sector for `lost_load` and a price change
    pub fn value_of_lost_load(&self, lost_load: f64, price_change: f64) -> Sectors {
        let voll = |share: f64, price: f64, intercept: f64, slope: f64| {
            (intercept + slope * price * price_change).max(0.0) * share * lost_load
        };
        Sectors {
            residential: voll(
                self.load_shares.residential,
                self.price_per_change.residential,
                self.voll_intercept.residential,
                self.voll_slope.residential,
            ),
            commercial: voll(
                self.load_shares.commercial,
                self.price_per_change.commercial,
                self.voll_intercept.commercial,
                self.voll_slope.commercial,
            ),
            industrial: voll(
                self.load_shares.industrial,
                self.price_per_change.industrial,
                self.voll_intercept.industrial,
                self.voll_slope.industrial,
            ),
        }
    }
}

/// 2050 fixed and variable costs of the balancing technologies, so either
/// variant prices its marginal generation without an explicit `[costs]` table
fn default_fixed() -> TechMap<f64> {
    TechMap::from_pairs([
        (Technology::Nuclear, 121.0),
        (Technology::Ngcc, 14.2),
        (Technology::Diesel, 11.33),
        (Technology::Oil, 11.33),
    ])
}

fn default_variable() -> TechMap<f64> {
    TechMap::from_pairs([
        (Technology::Nuclear, 0.66),
        (Technology::Ngcc, 0.52),
        (Technology::Transmission, 0.86),
        (Technology::Distribution, 1.15),
        (Technology::Diesel, 0.993),
        (Technology::Oil, 0.876),
        (Technology::ImportBiofuel, 1.389),
    ])
}

/// Deterministic cost inputs; projected costs override these per scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    /// Fixed cost per GW of capacity, millions
    pub fixed: TechMap<f64>,
    /// Variable cost per PJ of activity, millions
    pub variable: TechMap<f64>,
    /// Capital cost per GW of new capacity, millions
    pub investment: TechMap<f64>,
    /// Relative standard deviation of the replacement cost
    pub replacement_cv: f64,
    /// Annual inflation factor applied to damage costs from `min_year`
    pub inflation_rate: f64,
    /// Annual discount factor applied to damage costs from `base_year`
    pub discount_rate: f64,
    /// Defaults to the first simulated year
    pub base_year: Option<f64>,
}

impl Default for CostParams {
    fn default() -> Self {
        CostParams {
            fixed: default_fixed(),
            variable: default_variable(),
            investment: TechMap::default(),
            replacement_cv: 0.1,
            inflation_rate: 1.0,
            discount_rate: 1.0,
            base_year: None,
        }
    }
}

/// Everything one realization contributes to its cost
#[derive(Debug, Clone, Copy)]
pub struct AggregateInputs<'a> {
    pub components: &'a [Component],
    pub record: &'a FailureRecord,
    pub occurrences: &'a [Occurrence],
    /// Repair period of each occurrence, days
    pub repair_periods: &'a [f64],
    pub operational: &'a OperationalCosts,
    pub population: f64,
    /// Consumption per person
    pub per_capita: f64,
    pub electricity_price_change: f64,
    pub corruption: f64,
    /// Annual demand, PJ
    pub demand: f64,
    pub min_year: f64,
    pub max_year: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostBreakdown {
    pub total: f64,
    /// After the corruption factor
    pub damage: f64,
    pub operational: f64,
    pub outage: f64,
    pub demand: f64,
    pub value_of_lost_load: Sectors,
    /// Share of the remaining simulation time the grid was down
    pub unoperational_ratio: f64,
    pub repair_period_total: f64,
    /// Damage cost per component before the corruption factor
    pub repair_by_component: Vec<f64>,
    pub operational_ratios: TechMap<f64>,
}

impl CostBreakdown {
    /// Output-matrix row: normalized costs, demand, VoLL, repair days,
    /// per-component repair cost over demand, then the variant's
    /// operational ratios
    pub fn to_row(&self, variant: CostVariant) -> Vec<f64> {
        let per_mwh = |cost: f64| cost / self.demand / MWH_PER_PJ;
        let mut row = vec![
            per_mwh(self.total),
            per_mwh(self.damage),
            per_mwh(self.operational),
            per_mwh(self.outage),
            self.demand,
            self.value_of_lost_load.residential,
            self.value_of_lost_load.commercial,
            self.value_of_lost_load.industrial,
            self.repair_period_total,
        ];
        row.extend(self.repair_by_component.iter().map(|c| c / self.demand));
        row.extend(
            variant
                .reported_technologies()
                .iter()
                .map(|t| self.operational_ratios[*t]),
        );
        row
    }

    /// Names of the [`to_row`](Self::to_row) columns
    pub fn column_names(variant: CostVariant) -> Vec<String> {
        let mut names: Vec<String> = [
            "total_per_mwh",
            "damage_per_mwh",
            "operational_per_mwh",
            "outage_per_mwh",
            "demand_pj",
            "voll_residential",
            "voll_commercial",
            "voll_industrial",
            "repair_days",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();
        names.extend(ComponentType::ALL.iter().map(|c| {
            format!("repair_{}", c.to_string().to_lowercase().replace(' ', "_"))
        }));
        names.extend(
            variant
                .reported_technologies()
                .iter()
                .map(|t| format!("op_ratio_{}", t.code())),
        );
        names
    }
}

/// Combine damage, operational and outage costs of one realization.
///
/// Replacement costs are drawn here, component by component and occurrence by
/// occurrence, after every occurrence has been damaged and restored.
pub fn aggregate<R: Rng + ?Sized>(
    inputs: &AggregateInputs<'_>,
    params: &CostParams,
    outage_params: &OutageParams,
    rng: &mut R,
) -> Result<CostBreakdown> {
    let n = inputs.occurrences.len();
    if inputs.record.occurrences() != n || inputs.repair_periods.len() != n {
        return Err(GridHazardError::invalid(format!(
            "{} occurrences but {} failure columns and {} repair periods",
            n,
            inputs.record.occurrences(),
            inputs.repair_periods.len()
        )));
    }

    let mut outage = 0.0;
    let mut unop_ratio = 0.0;
    let mut value_of_lost_load = Sectors::default();
    if let Some(first) = inputs.occurrences.first() {
        let unavailable = inputs.record.line_unavailability(inputs.components);
        let downtime: f64 = unavailable
            .iter()
            .zip(inputs.repair_periods)
            .map(|(u, period)| u * period)
            .sum::<f64>()
            * inputs.corruption;
        let remaining = (inputs.max_year - first.year) * DAYS_PER_YEAR;
        unop_ratio = (downtime.min(remaining) / DAYS_PER_YEAR).clamp(0.0, 1.0);

        let lost_load =
            unop_ratio * inputs.population * inputs.per_capita * outage_params.recovery_factor;
        value_of_lost_load =
            outage_params.value_of_lost_load(lost_load, inputs.electricity_price_change);
        outage = value_of_lost_load.sum() / outage_params.voll_divisor;
    }

    let op_ratio = 1.0 - unop_ratio;
    let operational = inputs.operational.total * (op_ratio + unop_ratio / 2.0);

    let base_year = params.base_year.unwrap_or(inputs.min_year);
    let mut repair_by_component = vec![0.0; inputs.components.len()];
    for (i, (component, repair)) in inputs
        .components
        .iter()
        .zip(repair_by_component.iter_mut())
        .enumerate()
    {
        let cost = component.replacement_cost;
        for (j, occurrence) in inputs.occurrences.iter().enumerate() {
            let drawn = normal_draw(rng, cost, params.replacement_cv * cost).max(0.0);
            let escalation = params.inflation_rate.powf(occurrence.year - inputs.min_year)
                / params.discount_rate.powf(occurrence.year - base_year);
            *repair += drawn * inputs.record.get(i, j) * escalation;
        }
    }
    let damage = repair_by_component.iter().sum::<f64>() * inputs.corruption;

    Ok(CostBreakdown {
        total: damage + operational + outage,
        damage,
        operational,
        outage,
        demand: inputs.demand,
        value_of_lost_load,
        unoperational_ratio: unop_ratio,
        repair_period_total: inputs.repair_periods.iter().sum(),
        repair_by_component,
        operational_ratios: inputs.operational.ratios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_marginal_cost_ratio_excludes_fuel() {
        let caps = TechMap::from_pairs([(Technology::Nuclear, 2.0), (Technology::SolarPv, 1.0)]);
        let acts = TechMap::from_pairs([
            (Technology::Nuclear, 10.0),
            (Technology::ImportUranium, 29.1),
        ]);
        let fixed = TechMap::from_pairs([(Technology::Nuclear, 100.0), (Technology::SolarPv, 20.0)]);
        let variable = TechMap::from_pairs([
            (Technology::Nuclear, 2.0),
            (Technology::ImportUranium, 1.0),
        ]);
        let costs = operational_costs(&caps, &acts, &fixed, &variable, Technology::Nuclear, 1.5);

        // (200 + 20) * 1.5 + 29.1
        assert_relative_eq!(costs.by_technology[Technology::Nuclear], 359.1e6, epsilon = 1e-3);
        assert_relative_eq!(costs.by_technology[Technology::SolarPv], 20e6);
        assert_eq!(costs.by_technology[Technology::ImportUranium], 0.0);
        assert_relative_eq!(costs.total, 379.1e6, epsilon = 1e-3);
        let share: f64 = costs.ratios.iter().map(|(_, r)| r).sum();
        assert_relative_eq!(share, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_default_costs_price_both_marginal_technologies() {
        let params = CostParams::default();
        for variant in [CostVariant::FutureDecarbonized, CostVariant::BusinessAsUsual] {
            let marginal = variant.marginal();
            assert!(params.fixed[marginal] > 0.0, "{} fixed", marginal);
            assert!(params.variable[marginal] > 0.0, "{} variable", marginal);

            let caps = TechMap::from_pairs([(marginal, 1.0)]);
            let acts = TechMap::from_pairs([(marginal, 20.0)]);
            let costs = operational_costs(
                &caps,
                &acts,
                &params.fixed,
                &params.variable,
                marginal,
                1.0,
            );
            assert!(costs.by_technology[marginal] > 0.0);
        }
        assert_eq!(params.fixed[Technology::Nuclear], 121.0);
        assert_eq!(params.variable[Technology::Ngcc], 0.52);
    }

    #[test]
    fn test_zero_operational_cost_has_zero_ratios() {
        let zero = TechMap::default();
        let costs = operational_costs(&zero, &zero, &zero, &zero, Technology::Ngcc, 1.0);
        assert_eq!(costs.total, 0.0);
        assert!(costs.ratios.iter().all(|(_, r)| r == 0.0));
    }

    #[test]
    fn test_value_of_lost_load_is_never_negative() {
        let params = OutageParams::default();
        let cheap = params.value_of_lost_load(1000.0, 0.01);
        assert_eq!(cheap.sum(), 0.0);

        let voll = params.value_of_lost_load(1000.0, 1.0);
        let expected_res = (-1.0058 + 0.58 * 15.64) * 0.735 * 1000.0;
        assert_relative_eq!(voll.residential, expected_res, epsilon = 1e-9);
        assert!(voll.commercial > 0.0 && voll.industrial > 0.0);
    }

    #[test]
    fn test_column_names_match_row_length() {
        let breakdown = CostBreakdown {
            total: 3.0,
            damage: 1.0,
            operational: 1.0,
            outage: 1.0,
            demand: 2.0,
            value_of_lost_load: Sectors::default(),
            unoperational_ratio: 0.0,
            repair_period_total: 0.0,
            repair_by_component: vec![0.0; 6],
            operational_ratios: TechMap::default(),
        };
        for variant in [CostVariant::FutureDecarbonized, CostVariant::BusinessAsUsual] {
            assert_eq!(
                breakdown.to_row(variant).len(),
                CostBreakdown::column_names(variant).len()
            );
        }
        let names = CostBreakdown::column_names(CostVariant::FutureDecarbonized);
        assert_eq!(names[9], "repair_transmission_line");
        assert_eq!(names.last().map(String::as_str), Some("op_ratio_E_COND"));
        assert_relative_eq!(
            breakdown.to_row(CostVariant::FutureDecarbonized)[0],
            3.0 / 2.0 / MWH_PER_PJ
        );
    }
}
