//! The Monte Carlo driver
//!
//! Outer iterations draw a [`ScenarioParameters`]; inner iterations draw a
//! weather year and a hazard realization for it and price the damage. One
//! inner iteration runs, in order:
//!
//! 1. sample the weather regime and rebalance the dispatch
//! 2. price the dispatch with the grid fully available
//! 3. generate hurricane occurrences
//! 4. for each occurrence sample damage, then restoration
//! 5. aggregate damage, operational and outage costs
//!
//! The nested loop itself lives in `nested_mc`; this module adapts the grid
//! model to its [`NestedExperiment`] trait and checkpoints after every outer
//! iteration.

use crate::config::ExperimentConfig;
use crate::cost::{aggregate, operational_costs, AggregateInputs, CostBreakdown};
use crate::damage::{sample_damage, FailureRecord};
use crate::dispatch::{rebalance, DispatchShift, DispatchTable};
use crate::error::{GridHazardError, Result};
use crate::hazard::HazardGenerator;
use crate::output::{CheckpointWriter, RunMetadata};
use crate::projection::ProjectionTable;
use crate::restoration::compute_restoration;
use crate::scenario::{ScenarioInputs, ScenarioParameters};
use crate::weather::{solar_change, wind_change, WeatherRegime};
use crate::{catalog::HurricaneCatalog, Occurrence};
use nested_mc::{NestedExperiment, NestedLoop, OuterResult};
use rand::rngs::StdRng;
use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Damage and repair periods of every occurrence of one realization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OccurrenceOutcomes {
    pub record: FailureRecord,
    pub repair_periods: Vec<f64>,
    /// Components damaged in each occurrence
    pub damaged_components: Vec<usize>,
}

/// Everything produced by one inner iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    pub occurrences: Vec<Occurrence>,
    pub outcomes: OccurrenceOutcomes,
    pub breakdown: CostBreakdown,
}

/// Rows written by a finished run and where they went
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub completed: Vec<OuterResult>,
    pub output_path: PathBuf,
    pub input_path: PathBuf,
    pub metadata_path: PathBuf,
    pub elapsed_secs: f64,
}

pub struct MonteCarloDriver {
    config: ExperimentConfig,
    hazard: HazardGenerator,
    projections: ProjectionTable,
    /// Reference dispatch with the capacity scale applied
    dispatch: DispatchTable,
    reference_weather: WeatherRegime,
    max_marginal_activity: f64,
}

impl MonteCarloDriver {
    /// `dispatch` is the solver output as read; the configured capacity scale
    /// is applied here.
    pub fn new(
        config: ExperimentConfig,
        hazard: HazardGenerator,
        projections: ProjectionTable,
        dispatch: DispatchTable,
    ) -> Result<Self> {
        config.validate()?;
        let dispatch = dispatch.with_capacity_scale(config.experiment.capacity_scale);
        let max_marginal_activity =
            dispatch.max_marginal_activity(config.experiment.variant, &config.dispatch);
        let reference_weather = WeatherRegime::mean(&config.weather);
        Ok(MonteCarloDriver {
            config,
            hazard,
            projections,
            dispatch,
            reference_weather,
            max_marginal_activity,
        })
    }

    /// Load the catalog, projections and dispatch named in the config
    pub fn from_config(config: ExperimentConfig) -> Result<Self> {
        let catalog = HurricaneCatalog::from_path(&config.inputs.catalog)?;
        let hazard = config.hazard.apply(catalog.hazard_generator()?);
        let projections = ProjectionTable::from_path(&config.inputs.projections)?;
        let dispatch = DispatchTable::from_path(&config.inputs.dispatch)?;
        info!(
            storms = catalog.records().len(),
            base_rate = hazard.base_rate,
            mu = hazard.mu,
            sigma = hazard.sigma,
            "hazard model fitted"
        );
        Self::new(config, hazard, projections, dispatch)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn hazard(&self) -> &HazardGenerator {
        &self.hazard
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn scenario_inputs(&self) -> ScenarioInputs<'_> {
        ScenarioInputs {
            projections: &self.projections,
            settings: &self.config.scenario,
            costs: &self.config.costs,
            grid: &self.config.grid,
            dispatch: &self.dispatch,
        }
    }

    pub fn sample_scenario<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ScenarioParameters> {
        ScenarioParameters::sample(&self.scenario_inputs(), rng)
    }

    /// Damage and restore every occurrence in order
    pub fn run_occurrences<R: Rng + ?Sized>(
        &self,
        scenario: &ScenarioParameters,
        occurrences: &[Occurrence],
        rng: &mut R,
    ) -> OccurrenceOutcomes {
        let mut outcomes = OccurrenceOutcomes::default();
        for occurrence in occurrences {
            let damage = sample_damage(
                occurrence.wind_speed,
                &scenario.components,
                &self.config.fragility,
                rng,
            );
            let restoration = compute_restoration(
                &scenario.components,
                &damage.failure_probabilities,
                occurrence.wind_speed,
                &scenario.fleet,
                &self.config.restoration,
                rng,
            );
            outcomes
                .damaged_components
                .push(damage.damage_states.iter().filter(|d| **d).count());
            outcomes.record.push(damage.failure_probabilities);
            outcomes.repair_periods.push(restoration.repair_period);
        }
        outcomes
    }

    /// One inner iteration
    pub fn realize<R: Rng + ?Sized>(
        &self,
        scenario: &ScenarioParameters,
        rng: &mut R,
    ) -> Result<Realization> {
        let config = &self.config;
        let exp = &config.experiment;

        let weather = WeatherRegime::sample(&config.weather, rng);
        let shift = DispatchShift {
            solar_change: solar_change(&weather, &self.reference_weather, &config.weather),
            wind_change: wind_change(&weather, &self.reference_weather, &config.weather),
            demand: scenario.demand,
            demand_mean: config.inputs.demand_mean,
        };
        let rebalanced = rebalance(
            &self.dispatch,
            exp.variant,
            shift,
            self.max_marginal_activity,
            &config.dispatch,
        )?;
        let operational = operational_costs(
            &self.dispatch.capacities,
            &rebalanced.activities,
            &scenario.fixed,
            &scenario.variable,
            exp.variant.marginal(),
            rebalanced.added_cost_ratio,
        );

        let occurrences = self.hazard.generate(
            exp.min_year,
            exp.max_year,
            scenario.frequency_multiplier,
            scenario.intensity_multiplier,
            rng,
        )?;
        let outcomes = self.run_occurrences(scenario, &occurrences, rng);

        let inputs = AggregateInputs {
            components: &scenario.components,
            record: &outcomes.record,
            occurrences: &occurrences,
            repair_periods: &outcomes.repair_periods,
            operational: &operational,
            population: scenario.population,
            per_capita: scenario.per_capita,
            electricity_price_change: scenario.electricity_price_change,
            corruption: scenario.corruption,
            demand: scenario.demand,
            min_year: exp.min_year,
            max_year: exp.max_year,
        };
        let breakdown = aggregate(&inputs, &config.costs, &config.outage, rng)?;

        Ok(Realization {
            occurrences,
            outcomes,
            breakdown,
        })
    }

    fn metadata(&self, completed: usize, elapsed_secs: f64) -> RunMetadata {
        RunMetadata {
            config: self.config.clone(),
            seed: self.config.experiment.seed,
            timestamp: chrono::Utc::now().to_rfc3339(),
            hazard: self.hazard,
            output_columns: CostBreakdown::column_names(self.config.experiment.variant),
            input_columns: ScenarioParameters::input_column_names(&self.projections),
            completed_outer_iterations: completed,
            elapsed_secs,
        }
    }

    /// Run the whole experiment, rewriting the checkpoint files after every
    /// outer iteration. Outer iterations run on a rayon pool when `threads`
    /// is set and produce the same rows either way.
    pub fn run(&self) -> Result<RunSummary> {
        let exp = &self.config.experiment;
        let nested = NestedLoop::new(exp.outer_iterations, exp.inner_iterations, exp.seed);
        let writer = CheckpointWriter::new(&exp.output_dir, self.config.tag());
        let start = Instant::now();

        info!(
            experiment = %exp.name,
            variant = %exp.variant,
            outer = exp.outer_iterations,
            inner = exp.inner_iterations,
            seed = exp.seed,
            threads = ?exp.threads,
            "starting run"
        );
        std::fs::create_dir_all(&exp.output_dir)?;
        self.metadata(0, 0.0).write_json(&writer.metadata_path())?;

        let total = exp.outer_iterations;
        let checkpoint = |done: &[OuterResult]| -> Result<()> {
            writer.write(done)?;
            if let Some(last) = done.last() {
                info!(
                    outer = last.index,
                    completed = done.len(),
                    total,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    mean_total_per_mwh = last.output_row.first().copied().unwrap_or(f64::NAN),
                    "outer iteration complete"
                );
            }
            Ok(())
        };

        let completed = match exp.threads {
            Some(n) => nested.run_parallel(self, Some(n), checkpoint)?,
            None => nested.run(self, checkpoint)?,
        };

        let elapsed_secs = start.elapsed().as_secs_f64();
        self.metadata(completed.len(), elapsed_secs)
            .write_json(&writer.metadata_path())?;
        info!(completed = completed.len(), elapsed_secs, "run finished");

        Ok(RunSummary {
            completed,
            output_path: writer.output_path(),
            input_path: writer.input_path(),
            metadata_path: writer.metadata_path(),
            elapsed_secs,
        })
    }
}

impl NestedExperiment for MonteCarloDriver {
    type Scenario = ScenarioParameters;
    type Error = GridHazardError;

    fn sample_scenario(&self, rng: &mut StdRng) -> Result<ScenarioParameters> {
        MonteCarloDriver::sample_scenario(self, rng)
    }

    fn scenario_row(&self, scenario: &ScenarioParameters) -> Vec<f64> {
        scenario.input_row()
    }

    fn run_realization(&self, scenario: &ScenarioParameters, rng: &mut StdRng) -> Result<Vec<f64>> {
        let realization = self.realize(scenario, rng)?;
        debug!(
            occurrences = realization.occurrences.len(),
            total = realization.breakdown.total,
            unoperational_ratio = realization.breakdown.unoperational_ratio,
            "inner iteration"
        );
        Ok(realization.breakdown.to_row(self.config.experiment.variant))
    }
}
