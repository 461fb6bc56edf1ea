// Given-When-Then tests for the invariants of hazard generation, damage and
// restoration over a sweep of wind speeds and adversarial inputs

use grid_hazard::damage::sample_damage;
use grid_hazard::fragility::{FragilityModel, FragilitySet};
use grid_hazard::hazard::HazardGenerator;
use grid_hazard::inventory::{build_components, FleetCounts, GridParams};
use grid_hazard::restoration::{compute_restoration, RestorationParams};
use grid_hazard::{Component, ComponentType, TechMap, Technology};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn grid() -> (Vec<Component>, TechMap<f64>) {
    let caps = TechMap::from_pairs([
        (Technology::SolarPv, 4.8),
        (Technology::Wind, 1.2),
        (Technology::Transmission, 6.0),
        (Technology::Distribution, 6.0),
        (Technology::Substation, 6.0),
        (Technology::Tower, 6.0),
    ]);
    let components = build_components(&caps, 900.0, 1400.0, &GridParams::default());
    (components, caps)
}

#[test]
fn given_any_wind_speed_when_damage_sampled_then_probabilities_stay_in_unit_interval() {
    // GIVEN: the baseline grid and fragility curves
    let (components, _) = grid();
    let fragility = FragilitySet::baseline();
    let mut rng = StdRng::seed_from_u64(1234);

    // WHEN: damage is sampled from calm air to far beyond a category 5 storm
    for step in 0..=200 {
        let wind = step as f64 * 0.5;
        let draw = sample_damage(wind, &components, &fragility, &mut rng);

        // THEN: every failure probability is a probability
        assert_eq!(draw.failure_probabilities.len(), components.len());
        for p in &draw.failure_probabilities {
            assert!((0.0..=1.0).contains(p), "p = {} at {} m/s", p, wind);
        }
        // THEN: a component with zero probability is never damaged
        for (p, damaged) in draw.failure_probabilities.iter().zip(&draw.damage_states) {
            if *p == 0.0 {
                assert!(!damaged);
            }
        }
    }
}

#[test]
fn given_stronger_winds_when_mean_failure_evaluated_then_it_never_decreases() {
    // GIVEN: the baseline fragility curves
    let fragility = FragilitySet::baseline();

    // WHEN: the mean failure probability is traced over increasing wind speed
    for component_type in ComponentType::ALL {
        let mut previous = 0.0;
        for step in 1..=80 {
            let (mean, std) = fragility.failure_mean_std(step as f64, component_type);

            // THEN: the curves are monotone with a non-negative spread
            assert!(mean + 1e-12 >= previous, "{} at {}", component_type, step);
            assert!(std >= 0.0);
            previous = mean;
        }
    }
}

#[test]
fn given_certain_failure_of_everything_when_restored_then_period_is_capped() {
    // GIVEN: every component certainly destroyed and an enormous fleet
    let (components, _) = grid();
    let fleet = FleetCounts {
        wind_farms: 1e6,
        solar_farms: 1e6,
        substations: 1e6,
        towers: 1e9,
    };
    let probabilities = vec![1.0; components.len()];
    let params = RestorationParams::default();
    let mut rng = StdRng::seed_from_u64(7);

    for wind in [0.0, 20.0, 35.0, 50.0, 70.0, 120.0] {
        // WHEN: restoration is computed
        let outcome =
            compute_restoration(&components, &probabilities, wind, &fleet, &params, &mut rng);

        // THEN: the grid is back within a year
        assert!(outcome.repair_period > 0.0);
        assert!(outcome.repair_period <= 365.0);
        assert!(outcome.teams > 0.0);
    }
}

#[test]
fn given_no_damage_when_restored_then_no_repair_time_is_needed() {
    // GIVEN: a storm that failed nothing
    let (components, caps) = grid();
    let mut rng = StdRng::seed_from_u64(11);
    let fleet = FleetCounts::sample(&caps, &GridParams::default(), &mut rng);
    let probabilities = vec![0.0; components.len()];

    // WHEN: restoration is computed
    let outcome = compute_restoration(
        &components,
        &probabilities,
        45.0,
        &fleet,
        &RestorationParams::default(),
        &mut rng,
    );

    // THEN: nothing needs repairing
    assert_eq!(outcome.repair_period, 0.0);
    assert!(outcome.component_days.iter().all(|d| *d == 0.0));
}

#[test]
fn given_sampled_fleets_when_drawn_then_farm_counts_are_at_least_one() {
    // GIVEN: a grid with tiny renewable capacity
    let caps = TechMap::from_pairs([(Technology::SolarPv, 0.001), (Technology::Wind, 0.0)]);
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..100 {
        // WHEN: unit counts are drawn
        let fleet = FleetCounts::sample(&caps, &GridParams::default(), &mut rng);

        // THEN: each technology still has a farm to repair
        assert!(fleet.wind_farms >= 1.0);
        assert!(fleet.solar_farms >= 1.0);
        assert!(fleet.towers > 0.0);
    }
}

#[test]
fn given_a_long_window_when_hazard_generated_then_occurrences_are_ordered_and_inside_it() {
    // GIVEN: a historical rate of 0.6 storms per year
    let generator = HazardGenerator::new(0.6, 3.5, 0.4);
    let mut rng = StdRng::seed_from_u64(1234);

    // WHEN: a thousand years are generated with a doubled frequency
    let occurrences = generator
        .generate(2049.0, 3049.0, 2.0, 1.0, &mut rng)
        .unwrap();

    // THEN: the count matches the rate and every storm lies in the window
    let per_year = occurrences.len() as f64 / 1000.0;
    assert!((per_year - 1.2).abs() < 0.15, "rate {}", per_year);
    assert!(occurrences.windows(2).all(|w| w[0].year <= w[1].year));
    assert!(occurrences
        .iter()
        .all(|o| o.year >= 2049.0 && o.year < 3049.0 && o.wind_speed > 0.0));
}

#[test]
fn given_empty_window_when_hazard_generated_then_no_storms_occur() {
    // GIVEN: a window that ends where it starts
    let generator = HazardGenerator::new(0.6, 3.5, 0.4);
    let mut rng = StdRng::seed_from_u64(1);

    // WHEN: generated
    let occurrences = generator.generate(2050.0, 2050.0, 1.0, 1.0, &mut rng).unwrap();

    // THEN: the realization is empty
    assert!(occurrences.is_empty());
}
