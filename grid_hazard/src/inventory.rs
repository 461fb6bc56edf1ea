//! Grid inventory: the aggregated components exposed to hurricanes and the
//! counts of the physical assets behind them

use crate::stats::uniform_draw;
use crate::technology::{TechMap, Technology};
use crate::{Component, ComponentType};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lengths, unit costs and unit sizes of the island grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Metres of transmission line
    pub transmission_length: f64,
    /// Metres of distribution line
    pub distribution_length: f64,
    /// Replacement cost per GW of capacity, millions
    pub transmission_unit_cost: f64,
    pub distribution_unit_cost: f64,
    pub tower_unit_cost: f64,
    pub substation_unit_cost: f64,
    /// Nameplate range of one farm in MW
    pub wind_farm_mw: (f64, f64),
    pub solar_farm_mw: (f64, f64),
    /// Metres between transmission towers
    pub tower_spacing: (f64, f64),
    /// Substations on today's grid and the capacity (GW) they serve
    pub base_substations: f64,
    pub base_substation_capacity: f64,
    pub substation_capacity_divisor: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            transmission_length: 4_284_511.0,
            distribution_length: 26_742_880.0,
            transmission_unit_cost: 2251.804,
            distribution_unit_cost: 1057.159,
            tower_unit_cost: 634.296,
            substation_unit_cost: 500.163,
            wind_farm_mw: (40.0, 150.0),
            solar_farm_mw: (20.0, 100.0),
            tower_spacing: (150.0, 600.0),
            base_substations: 340.0,
            base_substation_capacity: 3.08,
            substation_capacity_divisor: 23.67,
        }
    }
}

/// One component per [`ComponentType`], in `ComponentType::ALL` order.
///
/// `solar_investment` and `wind_investment` are the projected capital costs
/// (millions per GW) of new farms.
pub fn build_components(
    capacities: &TechMap<f64>,
    solar_investment: f64,
    wind_investment: f64,
    params: &GridParams,
) -> Vec<Component> {
    const MILLION: f64 = 1e6;
    ComponentType::ALL
        .into_iter()
        .map(|component_type| match component_type {
            ComponentType::TransmissionLine => Component::line(
                component_type,
                capacities[Technology::Transmission] * params.transmission_unit_cost * MILLION,
                params.transmission_length,
            ),
            ComponentType::DistributionLine => Component::line(
                component_type,
                capacities[Technology::Distribution] * params.distribution_unit_cost * MILLION,
                params.distribution_length,
            ),
            ComponentType::Tower => Component::new(
                component_type,
                capacities[Technology::Tower] * params.tower_unit_cost * MILLION,
            ),
            ComponentType::Substation => Component::new(
                component_type,
                capacities[Technology::Substation] * params.substation_unit_cost * MILLION,
            ),
            ComponentType::SolarGenerator => Component::new(
                component_type,
                capacities[Technology::SolarPv] * solar_investment * MILLION,
            ),
            ComponentType::WindGenerator => Component::new(
                component_type,
                capacities[Technology::Wind] * wind_investment * MILLION,
            ),
        })
        .collect()
}

/// How many physical units each aggregated component stands for
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FleetCounts {
    pub wind_farms: f64,
    pub solar_farms: f64,
    pub substations: f64,
    pub towers: f64,
}

impl FleetCounts {
    /// Draw unit sizes for the scenario's capacities (GW). Farm counts are at
    /// least one.
    pub fn sample<R: Rng + ?Sized>(
        capacities: &TechMap<f64>,
        params: &GridParams,
        rng: &mut R,
    ) -> Self {
        let farms = |capacity: f64, (lo, hi): (f64, f64), rng: &mut R| {
            let unit_gw = uniform_draw(rng, lo, hi) / 1000.0;
            (capacity / unit_gw).floor().max(1.0)
        };
        let wind_farms = farms(capacities[Technology::Wind], params.wind_farm_mw, rng);
        let solar_farms = farms(capacities[Technology::SolarPv], params.solar_farm_mw, rng);

        let substations = (params.base_substations * capacities[Technology::Substation]
            / params.base_substation_capacity
            / params.substation_capacity_divisor)
            .floor();

        let (lo, hi) = params.tower_spacing;
        let towers = (params.transmission_length / uniform_draw(rng, lo, hi)).floor();

        FleetCounts {
            wind_farms,
            solar_farms,
            substations,
            towers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn capacities() -> TechMap<f64> {
        TechMap::from_pairs([
            (Technology::Transmission, 2.0),
            (Technology::Distribution, 3.0),
            (Technology::Tower, 1.0),
            (Technology::Substation, 72.9036),
            (Technology::SolarPv, 4.0),
            (Technology::Wind, 0.0),
        ])
    }

    #[test]
    fn test_components_follow_type_order() {
        let params = GridParams::default();
        let components = build_components(&capacities(), 1200.0, 1500.0, &params);
        let types: Vec<_> = components.iter().map(|c| c.component_type).collect();
        assert_eq!(types, ComponentType::ALL.to_vec());

        assert_relative_eq!(components[0].replacement_cost, 2.0 * 2251.804e6, epsilon = 1e-3);
        assert_eq!(components[0].line_length, Some(4_284_511.0));
        assert_eq!(components[1].line_length, Some(26_742_880.0));
        assert_relative_eq!(components[4].replacement_cost, 4.0 * 1200.0e6, epsilon = 1e-3);
        assert_eq!(components[5].replacement_cost, 0.0);
        assert_eq!(components[2].line_length, None);
    }

    #[test]
    fn test_fleet_counts() {
        let params = GridParams::default();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let fleet = FleetCounts::sample(&capacities(), &params, &mut rng);
            // 4 GW of 20-100 MW farms
            assert!(fleet.solar_farms >= 40.0 && fleet.solar_farms <= 200.0);
            // no wind capacity still counts one farm
            assert_eq!(fleet.wind_farms, 1.0);
            // 340 * 72.9036 / 3.08 / 23.67 = 340
            assert!((fleet.substations - 340.0).abs() <= 1.0);
            assert!(fleet.towers >= (4_284_511.0_f64 / 600.0).floor());
            assert!(fleet.towers <= (4_284_511.0_f64 / 150.0).floor());
        }
    }
}
