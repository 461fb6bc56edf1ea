//! Parallel execution of independent outer iterations
//!
//! Outer iterations of a nested experiment are statistically independent, so
//! they can be spread over a rayon thread pool. Results stay deterministic
//! because each outer iteration seeds its own RNG from its index (see
//! [`outer_seed`](crate::outer_seed)).
//!
//! # Example: 200 jobs on 8 threads
//!
//! ```rust
//! use nested_mc::parallel::ParallelRunner;
//!
//! let results = ParallelRunner::new(200, |index| index * 2)
//!     .num_threads(8)
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(results.len(), 200);
//! assert_eq!(results[10], Ok(20));
//! ```
//!
//! # Error Handling
//!
//! Panics in individual jobs are caught and returned as `Err(String)`.
//! Other jobs continue executing normally.
//!
//! # Checkpointing
//!
//! Jobs finish in arbitrary order. [`OrderedCommit`] buffers finished results
//! and hands them to a single writer callback strictly in index order, so a
//! checkpoint file always holds a gap-free prefix of the outer loop.

use crate::{NestedError, NestedExperiment, NestedLoop, OuterResult};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Executes independent indexed jobs in parallel
///
/// The job function `F` receives the job index and must be `Send + Sync`
/// because it is called from several worker threads.
pub struct ParallelRunner<T, F>
where
    F: Fn(usize) -> T + Send + Sync,
    T: Send,
{
    num_jobs: usize,
    job: F,
    num_threads: Option<usize>,
}

impl<T, F> ParallelRunner<T, F>
where
    F: Fn(usize) -> T + Send + Sync,
    T: Send,
{
    /// Create a new parallel runner
    ///
    /// # Arguments
    ///
    /// * `num_jobs` - Number of independent jobs to run
    /// * `job` - Closure computing the result for one job index
    pub fn new(num_jobs: usize, job: F) -> Self {
        ParallelRunner {
            num_jobs,
            job,
            num_threads: None,
        }
    }

    /// Set number of threads (defaults to rayon's global pool)
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Execute all jobs and return results in index order
    ///
    /// Failed jobs (panics) are captured and returned as `Err(String)`.
    /// Building a custom-sized pool can fail, which is the outer `Err`.
    pub fn run(self) -> Result<Vec<Result<T, String>>, String> {
        let pool = match self.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| e.to_string())?,
            ),
            None => None,
        };

        let execute = || {
            (0..self.num_jobs)
                .into_par_iter()
                .map(|index| {
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.job)(index)))
                        .map_err(|panic| {
                            if let Some(s) = panic.downcast_ref::<&str>() {
                                s.to_string()
                            } else if let Some(s) = panic.downcast_ref::<String>() {
                                s.clone()
                            } else {
                                "Unknown panic".to_string()
                            }
                        })
                })
                .collect::<Vec<Result<T, String>>>()
        };

        Ok(match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        })
    }
}

/// Hands finished outer results to one writer in index order.
///
/// Results that finish early are parked until every lower index has been
/// committed. After the first failure nothing further is committed. A writer
/// that panics is recorded as a failure of the outer iteration it was
/// writing.
pub struct OrderedCommit<C, E> {
    state: Mutex<CommitState<C, E>>,
}

struct CommitState<C, E> {
    next_index: usize,
    pending: BTreeMap<usize, OuterResult>,
    committed: Vec<OuterResult>,
    writer: C,
    failure: Option<NestedError<E>>,
}

impl<C, E> CommitState<C, E> {
    fn record_writer_panic(&mut self) {
        if self.failure.is_none() {
            self.failure = Some(NestedError::Panicked {
                index: self.next_index.saturating_sub(1),
                message: "checkpoint writer panicked".to_string(),
            });
        }
    }
}

impl<C, E> OrderedCommit<C, E>
where
    C: FnMut(&[OuterResult]) -> Result<(), E>,
{
    pub fn new(writer: C) -> Self {
        OrderedCommit {
            state: Mutex::new(CommitState {
                next_index: 0,
                pending: BTreeMap::new(),
                committed: Vec::new(),
                writer,
                failure: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CommitState<C, E>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            let mut state = poisoned.into_inner();
            state.record_writer_panic();
            state
        })
    }

    /// Record the outcome of one outer iteration
    pub fn submit(&self, index: usize, outcome: Result<OuterResult, NestedError<E>>) {
        let mut state = self.lock();
        if state.failure.is_some() {
            return;
        }
        match outcome {
            Ok(result) => {
                state.pending.insert(index, result);
            }
            Err(error) => {
                state.failure = Some(error);
                return;
            }
        }
        while let Some(result) = {
            let next = state.next_index;
            state.pending.remove(&next)
        } {
            state.committed.push(result);
            state.next_index += 1;
            let CommitState {
                committed, writer, ..
            } = &mut *state;
            if let Err(error) = writer(committed.as_slice()) {
                let index = state.next_index - 1;
                state.failure = Some(NestedError::Experiment { index, error });
                return;
            }
        }
    }

    /// Committed rows, or the first failure recorded
    pub fn finish(self) -> Result<Vec<OuterResult>, NestedError<E>> {
        let state = self.state.into_inner().unwrap_or_else(|poisoned| {
            let mut state = poisoned.into_inner();
            state.record_writer_panic();
            state
        });
        match state.failure {
            Some(error) => Err(error),
            None => Ok(state.committed),
        }
    }
}

impl NestedLoop {
    /// Run the outer loop on a rayon pool.
    ///
    /// Produces exactly the rows of [`NestedLoop::run`] for the same seed.
    /// `on_complete` is invoked from worker threads, one call at a time and
    /// always with a gap-free prefix of the outer loop.
    pub fn run_parallel<X, C>(
        &self,
        experiment: &X,
        num_threads: Option<usize>,
        on_complete: C,
    ) -> Result<Vec<OuterResult>, NestedError<X::Error>>
    where
        X: NestedExperiment,
        C: FnMut(&[OuterResult]) -> Result<(), X::Error> + Send,
    {
        let commit = OrderedCommit::new(on_complete);

        let mut runner = ParallelRunner::new(self.outer_iterations, |index| {
            let outcome = self
                .run_outer(experiment, index)
                .map_err(|error| NestedError::Experiment { index, error });
            commit.submit(index, outcome);
        });
        if let Some(n) = num_threads {
            runner = runner.num_threads(n);
        }

        let statuses = runner.run().map_err(NestedError::ThreadPool)?;
        for (index, status) in statuses.into_iter().enumerate() {
            if let Err(message) = status {
                commit.submit(index, Err(NestedError::Panicked { index, message }));
            }
        }

        commit.finish()
    }
}
