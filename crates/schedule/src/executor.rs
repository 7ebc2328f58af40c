//! Executors for the sub-graphs of one level.
//!
//! An executor receives the plans of one level together with the values
//! committed by earlier levels and returns every plan's rows. It never
//! writes `x` itself; the solver commits the results once the whole level
//! has finished, which is the barrier between levels.

use crate::config::ScheduleConfig;
use crate::solver::SubGraphPlan;
use crate::{Error, Result};
use amsla_graph::NodeId;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Runs the independent sub-graph plans of one level.
pub trait BulkExecutor: Send + Sync {
    /// Execute every plan against `x` and return their rows, one result
    /// per plan in plan order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Executor`] if the work could not be dispatched.
    fn execute_level(&self, work: &[SubGraphPlan], x: &[f64]) -> Result<Vec<Vec<(NodeId, f64)>>>;
}

/// Runs plans one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl BulkExecutor for SequentialExecutor {
    fn execute_level(&self, work: &[SubGraphPlan], x: &[f64]) -> Result<Vec<Vec<(NodeId, f64)>>> {
        Ok(work.iter().map(|plan| plan.execute(x)).collect())
    }
}

/// Runs plans in parallel on a dedicated thread pool.
///
/// The pool is created explicitly and lives as long as the executor; no
/// global pool is touched.
#[derive(Debug)]
pub struct CpuExecutor {
    pool: ThreadPool,
}

impl CpuExecutor {
    /// Create an executor with `threads` workers, or one per core.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Executor`] for a zero thread count or if the pool
    /// cannot be built.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        if threads == Some(0) {
            return Err(Error::Executor {
                message: "thread count must be positive".to_string(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|index| format!("amsla-solve-{index}"))
            .build()
            .map_err(|e| Error::Executor {
                message: format!("Failed to build thread pool: {e}"),
            })?;
        debug!(threads = pool.current_num_threads(), "Started CPU executor");
        Ok(Self { pool })
    }

    /// Create an executor sized by `config.threads`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate, or
    /// [`Error::Executor`] if the pool cannot be built.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.threads)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Stop the worker threads.
    pub fn shutdown(self) {
        let threads = self.threads();
        drop(self.pool);
        debug!(threads, "Shut down CPU executor");
    }
}

impl BulkExecutor for CpuExecutor {
    fn execute_level(&self, work: &[SubGraphPlan], x: &[f64]) -> Result<Vec<Vec<(NodeId, f64)>>> {
        Ok(self
            .pool
            .install(|| work.par_iter().map(|plan| plan.execute(x)).collect()))
    }
}
