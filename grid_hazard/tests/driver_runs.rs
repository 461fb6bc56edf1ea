// Given-When-Then tests for full nested runs of the Monte Carlo driver on
// the bundled data files

use grid_hazard::config::{ExperimentConfig, InputPaths};
use grid_hazard::cost::CostBreakdown;
use grid_hazard::dispatch::{CostVariant, DispatchTable};
use grid_hazard::driver::MonteCarloDriver;
use grid_hazard::hazard::HazardGenerator;
use grid_hazard::output::read_matrix;
use grid_hazard::projection::ProjectionTable;
use grid_hazard::scenario::ScenarioParameters;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

fn data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn small_config(variant: CostVariant, output_dir: &Path) -> ExperimentConfig {
    let dispatch = match variant {
        CostVariant::FutureDecarbonized => "dispatch_fd.csv",
        CostVariant::BusinessAsUsual => "dispatch_bau.csv",
    };
    let inputs = InputPaths {
        catalog: data("hurricane_catalog.csv"),
        projections: data("projections_2050.csv"),
        dispatch: data(dispatch),
        demand_mean: 58.9,
    };
    let mut config = ExperimentConfig::baseline("smoke", variant, inputs);
    config.experiment.outer_iterations = 3;
    config.experiment.inner_iterations = 20;
    config.experiment.output_dir = output_dir.to_path_buf();
    config
}

fn driver(config: ExperimentConfig) -> MonteCarloDriver {
    let projections = ProjectionTable::from_path(&config.inputs.projections).unwrap();
    let dispatch = DispatchTable::from_path(&config.inputs.dispatch).unwrap();
    MonteCarloDriver::new(
        config,
        HazardGenerator::new(0.6, 3.5, 0.4),
        projections,
        dispatch,
    )
    .unwrap()
}

#[test]
fn given_small_run_when_finished_then_checkpoint_has_one_row_per_outer_iteration() {
    // GIVEN: three outer iterations of twenty realizations
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(CostVariant::FutureDecarbonized, dir.path());
    let expected_columns = CostBreakdown::column_names(config.experiment.variant).len();
    let driver = driver(config);

    // WHEN: the run completes
    let summary = driver.run().unwrap();

    // THEN: both matrices hold a finite row per outer iteration
    let outputs = read_matrix(&summary.output_path).unwrap();
    let inputs = read_matrix(&summary.input_path).unwrap();
    assert_eq!(summary.completed.len(), 3);
    assert_eq!(outputs.len(), 3);
    assert_eq!(inputs.len(), 3);
    for row in &outputs {
        assert_eq!(row.len(), expected_columns);
        assert!(row.iter().all(|v| v.is_finite()));
    }
    assert!(summary.output_path.ends_with("outputFD.txt"));

    // THEN: the metadata records the finished run
    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.metadata_path).unwrap()).unwrap();
    assert_eq!(metadata["completed_outer_iterations"], 3);
    assert_eq!(metadata["seed"], 1234);
}

#[test]
fn given_same_seed_when_run_twice_then_matrices_are_identical() {
    // GIVEN: two output directories and the same configuration
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    // WHEN: the experiment runs in each
    let a = driver(small_config(CostVariant::BusinessAsUsual, first.path()))
        .run()
        .unwrap();
    let b = driver(small_config(CostVariant::BusinessAsUsual, second.path()))
        .run()
        .unwrap();

    // THEN: the files are byte for byte the same
    assert_eq!(
        std::fs::read_to_string(&a.output_path).unwrap(),
        std::fs::read_to_string(&b.output_path).unwrap()
    );
    assert_eq!(
        std::fs::read_to_string(&a.input_path).unwrap(),
        std::fs::read_to_string(&b.input_path).unwrap()
    );
}

#[test]
fn given_thread_pool_when_run_then_rows_match_sequential_run() {
    // GIVEN: the same experiment configured sequentially and on four threads
    let sequential_dir = tempfile::tempdir().unwrap();
    let parallel_dir = tempfile::tempdir().unwrap();
    let sequential = small_config(CostVariant::FutureDecarbonized, sequential_dir.path());
    let mut parallel = small_config(CostVariant::FutureDecarbonized, parallel_dir.path());
    parallel.experiment.threads = Some(4);

    // WHEN: both run
    let a = driver(sequential).run().unwrap();
    let b = driver(parallel).run().unwrap();

    // THEN: every outer iteration produced the same rows in the same order
    assert_eq!(a.completed, b.completed);
    assert_eq!(
        read_matrix(&a.output_path).unwrap(),
        read_matrix(&b.output_path).unwrap()
    );
}

#[test]
fn given_sampled_scenario_when_realized_then_total_is_sum_of_parts() {
    // GIVEN: one scenario of the decarbonized pathway
    let dir = tempfile::tempdir().unwrap();
    let driver = driver(small_config(CostVariant::FutureDecarbonized, dir.path()));
    let mut rng = StdRng::seed_from_u64(2049);
    let scenario = driver.sample_scenario(&mut rng).unwrap();

    for _ in 0..50 {
        // WHEN: a realization is drawn
        let realization = driver.realize(&scenario, &mut rng).unwrap();
        let b = &realization.breakdown;

        // THEN: the cost identity holds and every storm has a bounded repair
        assert_eq!(b.total, b.damage + b.operational + b.outage);
        assert!(b.damage >= 0.0 && b.outage >= 0.0);
        assert!((0.0..=1.0).contains(&b.unoperational_ratio));
        assert_eq!(
            realization.outcomes.repair_periods.len(),
            realization.occurrences.len()
        );
        assert!(realization
            .outcomes
            .repair_periods
            .iter()
            .all(|p| (0.0..=365.0).contains(p)));
        if realization.occurrences.is_empty() {
            assert_eq!(b.damage, 0.0);
            assert_eq!(b.outage, 0.0);
        }
    }

    // THEN: the scenario row lines up with its column names
    let names = ScenarioParameters::input_column_names(
        &ProjectionTable::from_path(data("projections_2050.csv")).unwrap(),
    );
    assert_eq!(scenario.input_row().len(), names.len());
}

#[test]
fn given_bundled_experiment_files_when_loaded_then_they_validate() {
    // GIVEN: the experiments shipped with the crate
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("experiments");

    for (file, variant) in [
        ("fd_baseline.toml", CostVariant::FutureDecarbonized),
        ("bau_baseline.toml", CostVariant::BusinessAsUsual),
    ] {
        // WHEN: each is loaded
        let config = ExperimentConfig::from_path(dir.join(file)).unwrap();

        // THEN: the variant is right and the inputs resolve to real files
        assert_eq!(config.experiment.variant, variant);
        assert!(config.inputs.catalog.exists());
        assert!(config.inputs.projections.exists());
        assert!(config.inputs.dispatch.exists());
    }
}

#[test]
fn given_bundled_catalog_when_driver_built_from_config_then_hazard_is_fitted() {
    // GIVEN: the decarbonized experiment redirected to a scratch directory
    let dir = tempfile::tempdir().unwrap();
    let experiments = Path::new(env!("CARGO_MANIFEST_DIR")).join("experiments");
    let mut config = ExperimentConfig::from_path(experiments.join("fd_baseline.toml")).unwrap();
    config.experiment.output_dir = dir.path().to_path_buf();

    // WHEN: the driver fits the hazard model from the catalog
    let driver = MonteCarloDriver::from_config(config).unwrap();

    // THEN: the fitted process is usable
    let hazard = driver.hazard();
    assert!(hazard.base_rate > 0.0);
    assert!(hazard.sigma > 0.0);
}

#[cfg(feature = "long-tests")]
#[test]
fn given_reference_loop_sizes_when_run_then_every_row_is_finite() {
    // GIVEN: the published loop sizes on eight threads
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(CostVariant::FutureDecarbonized, dir.path());
    config.experiment.outer_iterations = 200;
    config.experiment.inner_iterations = 1000;
    config.experiment.threads = Some(8);

    // WHEN: run to completion
    let summary = driver(config).run().unwrap();

    // THEN: every averaged row is finite
    let outputs = read_matrix(&summary.output_path).unwrap();
    assert_eq!(outputs.len(), 200);
    assert!(outputs.iter().flatten().all(|v| v.is_finite()));
}
