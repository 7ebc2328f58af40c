//! Static parallel schedules for sparse lower-triangular solves.
//!
//! Analysis splits the dependency graph of a matrix into weakly-connected
//! components, cuts large components into bounded sub-graphs, ranks the
//! sub-graphs into levels, and orders the edges inside every sub-graph into
//! time slots. The resulting [`Schedule`] is computed once, can be
//! persisted, and drives any number of [`TriangularSolver::solve`] calls.
//!
//! # Key Types
//!
//! - [`Analyzer`]: runs the phases and returns a [`Schedule`]
//! - [`ScheduleConfig`]: sub-graph capacity and pipeline switches
//! - [`TriangularSolver`]: level-by-level forward substitution
//! - [`BulkExecutor`]: runs the sub-graphs of one level ([`CpuExecutor`],
//!   [`SequentialExecutor`])
//!
//! # Example
//!
//! ```
//! use amsla_schedule::{ScheduleConfig, TriangularSolver, analyze_triples};
//!
//! // L = [[2, 0, 0], [1, 1, 0], [0, 3, 3]]
//! let (graph, schedule) = analyze_triples(
//!     &[1, 2, 3, 2, 3],
//!     &[1, 2, 3, 1, 2],
//!     &[2.0, 1.0, 3.0, 1.0, 3.0],
//!     ScheduleConfig::default(),
//! )?;
//! let solver = TriangularSolver::new(&graph, &schedule)?;
//! assert_eq!(solver.solve(&[2.0, 3.0, 9.0])?, vec![1.0, 2.0, 1.0]);
//! # Ok::<(), amsla_schedule::Error>(())
//! ```

mod analysis;
mod components;
mod config;
mod error;
mod executor;
mod levels;
mod progress;
mod schedule;
mod scheduler;
mod solver;
mod subgraphs;

pub use analysis::{Analyzer, analyze_triples};
pub use components::{ComponentGroups, component_groups, merge_components, partition_components};
pub use config::{DEFAULT_MAX_SUB_GRAPH_SIZE, ScheduleConfig};
pub use error::{Error, Result};
pub use executor::{BulkExecutor, CpuExecutor, SequentialExecutor};
pub use levels::{LevelGroups, level_groups, organize_levels, sub_graph_dependencies};
pub use progress::{Phase, ProgressRenderer, TagSnapshot};
pub use schedule::{NodeTags, Schedule, SubGraphTags};
pub use scheduler::{SubGraphSlots, schedule_sub_graph, schedule_time_slots};
pub use solver::{SubGraphPlan, TriangularSolver};
pub use subgraphs::{
    AttemptOutcome, DENSITIES, SortCriterion, SubGraphGroups, SubGraphPartitioner,
    assign_single_partition, sub_graph_groups,
};

pub use amsla_graph as graph;
