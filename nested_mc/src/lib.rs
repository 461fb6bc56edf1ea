//! Nested (outer/inner) Monte Carlo loops
//!
//! An experiment samples one *scenario* per outer iteration and then runs many
//! independent *realizations* of that scenario in the inner loop. The inner
//! rows are averaged column-wise into one output row per outer iteration.
//!
//! Every outer iteration owns its own `StdRng`, seeded from
//! `base_seed + outer_index`, so results do not depend on execution order or
//! on how many threads run the outer loop.

pub mod parallel;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

/// Errors raised while driving a nested experiment
#[derive(Error, Debug)]
pub enum NestedError<E> {
    /// The experiment itself returned an error
    #[error("outer iteration {index} failed: {error}")]
    Experiment { index: usize, error: E },

    /// An outer iteration panicked (only reported by the parallel runner)
    #[error("outer iteration {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    #[error("could not build thread pool: {0}")]
    ThreadPool(String),
}

/// One stochastic experiment with a scenario layer and a realization layer.
///
/// Implementors must be `Sync` so the outer loop can be spread over threads.
pub trait NestedExperiment: Sync {
    type Scenario;
    type Error: Send;

    /// Draw the scenario used by every realization of one outer iteration.
    fn sample_scenario(&self, rng: &mut StdRng) -> Result<Self::Scenario, Self::Error>;

    /// Values recorded for the scenario (the "input" matrix row).
    fn scenario_row(&self, scenario: &Self::Scenario) -> Vec<f64>;

    /// Run one realization and return its output row.
    fn run_realization(
        &self,
        scenario: &Self::Scenario,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>, Self::Error>;
}

/// Rows produced by one completed outer iteration
#[derive(Debug, Clone, PartialEq)]
pub struct OuterResult {
    pub index: usize,
    pub input_row: Vec<f64>,
    pub output_row: Vec<f64>,
}

/// Seed used by outer iteration `index`
pub fn outer_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add(index as u64)
}

/// Column-wise mean of equally sized rows.
///
/// NaN entries are not filtered: a NaN in any row makes that column's mean NaN.
pub fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut sums = vec![0.0; first.len()];
    for row in rows {
        for (sum, value) in sums.iter_mut().zip(row) {
            *sum += value;
        }
    }
    let n = rows.len() as f64;
    sums.into_iter().map(|s| s / n).collect()
}

/// Outer/inner loop sizes and the base seed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestedLoop {
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    pub base_seed: u64,
}

impl NestedLoop {
    pub fn new(outer_iterations: usize, inner_iterations: usize, base_seed: u64) -> Self {
        NestedLoop {
            outer_iterations,
            inner_iterations,
            base_seed,
        }
    }

    /// Run a single outer iteration: sample the scenario, run the inner loop
    /// and average the realization rows.
    pub fn run_outer<X: NestedExperiment>(
        &self,
        experiment: &X,
        index: usize,
    ) -> Result<OuterResult, X::Error> {
        let mut rng = StdRng::seed_from_u64(outer_seed(self.base_seed, index));
        let scenario = experiment.sample_scenario(&mut rng)?;
        let input_row = experiment.scenario_row(&scenario);

        let mut rows = Vec::with_capacity(self.inner_iterations);
        for _ in 0..self.inner_iterations {
            rows.push(experiment.run_realization(&scenario, &mut rng)?);
        }

        Ok(OuterResult {
            index,
            input_row,
            output_row: column_means(&rows),
        })
    }

    /// Run every outer iteration in order.
    ///
    /// `on_complete` is called after each outer iteration with all rows
    /// completed so far, which is where callers checkpoint to disk. The first
    /// error stops the loop; rows already handed to `on_complete` stay valid.
    pub fn run<X, C>(
        &self,
        experiment: &X,
        mut on_complete: C,
    ) -> Result<Vec<OuterResult>, NestedError<X::Error>>
    where
        X: NestedExperiment,
        C: FnMut(&[OuterResult]) -> Result<(), X::Error>,
    {
        let mut completed = Vec::with_capacity(self.outer_iterations);
        for index in 0..self.outer_iterations {
            let result = self
                .run_outer(experiment, index)
                .map_err(|error| NestedError::Experiment { index, error })?;
            completed.push(result);
            on_complete(&completed).map_err(|error| NestedError::Experiment { index, error })?;
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    struct UniformMean;

    impl NestedExperiment for UniformMean {
        type Scenario = f64;
        type Error = String;

        fn sample_scenario(&self, rng: &mut StdRng) -> Result<f64, String> {
            Ok(rng.gen_range(1.0..2.0))
        }

        fn scenario_row(&self, scenario: &f64) -> Vec<f64> {
            vec![*scenario]
        }

        fn run_realization(&self, scenario: &f64, rng: &mut StdRng) -> Result<Vec<f64>, String> {
            let draw: f64 = rng.gen_range(0.0..1.0);
            Ok(vec![scenario * draw, 1.0])
        }
    }

    #[test]
    fn test_column_means() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 6.0]];
        assert_eq!(column_means(&rows), vec![2.0, 4.0]);
        assert!(column_means(&[]).is_empty());
    }

    #[test]
    fn test_nan_propagates_into_mean() {
        let rows = vec![vec![1.0, f64::NAN], vec![3.0, 1.0]];
        let means = column_means(&rows);
        assert_eq!(means[0], 2.0);
        assert!(means[1].is_nan());
    }

    #[test]
    fn test_outer_seed_offsets_base() {
        assert_eq!(outer_seed(1234, 0), 1234);
        assert_eq!(outer_seed(1234, 5), 1239);
        assert_eq!(outer_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn test_run_outer_is_deterministic() {
        let experiment = UniformMean;
        let nested = NestedLoop::new(3, 50, 7);
        let a = nested.run_outer(&experiment, 2).unwrap();
        let b = nested.run_outer(&experiment, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.index, 2);
        assert_eq!(a.output_row.len(), 2);
        assert_eq!(a.output_row[1], 1.0);
    }

    #[test]
    fn test_run_calls_checkpoint_after_each_outer() {
        let experiment = UniformMean;
        let nested = NestedLoop::new(4, 10, 1);
        let mut seen = Vec::new();
        let results = nested
            .run(&experiment, |done| {
                seen.push(done.len());
                Ok(())
            })
            .unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_run_stops_on_checkpoint_error() {
        let experiment = UniformMean;
        let nested = NestedLoop::new(5, 2, 1);
        let result = nested.run(&experiment, |done| {
            if done.len() == 2 {
                Err("disk full".to_string())
            } else {
                Ok(())
            }
        });
        match result {
            Err(NestedError::Experiment { index, error }) => {
                assert_eq!(index, 1);
                assert_eq!(error, "disk full");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }
}
