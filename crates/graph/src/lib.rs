//! Dependency graph model for scheduled sparse triangular solves.
//!
//! This crate turns the coordinate triples of a sparse lower-triangular
//! matrix into a dependency graph: one node per unknown, one edge per
//! nonzero. The graph carries independent tag layers (component, sub-graph,
//! sub-graph level, time-slot) that the analysis phases in `amsla-schedule`
//! fill in.
//!
//! # Key Types
//!
//! - [`DependencyGraph`]: node/edge arenas, cached adjacency and tag layers
//! - [`TagLayer`]: a batch-validated, resettable tag assignment
//! - [`propagate`]: the breadth-first labelling shared by every phase
//!
//! # Example
//!
//! ```
//! use amsla_graph::{DependencyGraph, NodeId};
//!
//! // L = [[2, 0], [1, 4]]
//! let graph = DependencyGraph::from_triples(&[1, 2, 2], &[1, 1, 2], &[2.0, 1.0, 4.0])?;
//! let second = NodeId::new(2).expect("non-zero index");
//! assert_eq!(graph.parents_of_node(second).len(), 1);
//! # Ok::<(), amsla_graph::Error>(())
//! ```

mod error;
mod graph;
mod sort;
mod tags;
mod traversal;
mod validation;

pub use error::{Error, Result};
pub use graph::{DependencyGraph, Edge, EdgeId, NodeId};
pub use sort::{Degree, SortOrder};
pub use tags::{ComponentId, SubGraphId, SubGraphLevel, TagKey, TagLayer, TimeSlot};
pub use traversal::{Propagation, Visit, propagate};
pub use validation::{ValidationResult, validate_triples};
