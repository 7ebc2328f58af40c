//! Error types for schedule analysis and scheduled solves.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for schedule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while analysing a matrix or solving with a schedule.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Building or tagging the dependency graph failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] amsla_graph::Error),

    /// A phase converged but left nodes or edges without a tag.
    #[error("{phase} left {unassigned} entries unassigned")]
    #[diagnostic(
        code(amsla::schedule::incomplete_assignment),
        help("This indicates a defect in the analysis, not in the input matrix")
    )]
    IncompleteAssignment {
        /// Phase that failed to converge.
        phase: &'static str,
        /// Number of nodes or edges left unassigned.
        unassigned: usize,
    },

    /// Every partitioning heuristic failed for a component.
    #[error(
        "Could not partition component {component} into sub-graphs of at most {max_sub_graph_size} nodes after {attempts} attempts"
    )]
    #[diagnostic(
        code(amsla::schedule::partitioning_exhausted),
        help("Increase maxSubGraphSize or enable singlePartition")
    )]
    PartitioningExhausted {
        /// Component that could not be partitioned.
        component: usize,
        /// Capacity bound in effect.
        max_sub_graph_size: usize,
        /// Number of (sort criterion, density) combinations tried.
        attempts: usize,
    },

    /// Sub-graph levelling could not converge.
    #[error("Sub-graph dependencies are not acyclic: {unleveled} sub-graphs could not be levelled")]
    #[diagnostic(
        code(amsla::schedule::non_dag_dependencies),
        help("Sub-graph partitioning produced cyclic inter-sub-graph edges")
    )]
    NonDagDependencies {
        /// Number of sub-graphs left without a level.
        unleveled: usize,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(amsla::schedule::invalid_config))]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A right-hand side or persisted schedule does not match the matrix.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(amsla::schedule::dimension_mismatch))]
    DimensionMismatch {
        /// Size implied by the matrix.
        expected: usize,
        /// Size that was supplied.
        actual: usize,
    },

    /// The bulk executor could not be created or failed to run.
    #[error("Executor error: {message}")]
    #[diagnostic(code(amsla::schedule::executor))]
    Executor {
        /// Description of the failure.
        message: String,
    },

    /// I/O error while persisting or loading a schedule.
    #[error("I/O error during {operation} at {}: {source}", path.display())]
    #[diagnostic(code(amsla::schedule::io))]
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A persisted schedule could not be encoded or decoded.
    #[error("Schedule serialization failed: {0}")]
    #[diagnostic(code(amsla::schedule::serialization))]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether a caller may retry with a different heuristic.
    ///
    /// Only partitioning exhaustion is recoverable; every other error
    /// signals invalid input or a defect and aborts the analysis.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PartitioningExhausted { .. })
    }
}
