//! Topological levelling of sub-graphs.
//!
//! Sub-graphs are the nodes of a quotient graph whose edges are the
//! external (cross-sub-graph) matrix entries, pointing from the producing
//! sub-graph to the consuming one. Level 1 holds the sub-graphs nothing
//! feeds into; every other sub-graph sits one level above its highest
//! producer.

use crate::subgraphs::sub_graph_groups;
use crate::{Error, Result};
use amsla_graph::{DependencyGraph, SubGraphId, SubGraphLevel, TagKey};
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Sub-graphs of every level, keyed by level.
pub type LevelGroups = BTreeMap<SubGraphLevel, Vec<SubGraphId>>;

/// Build the sub-graph dependency graph of a partitioned matrix.
///
/// Every sub-graph is a node, including isolated ones. An edge `a -> b`
/// means some row of `b` reads a value produced in `a`.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if any node lacks a sub-graph.
pub fn sub_graph_dependencies(graph: &DependencyGraph) -> Result<DiGraphMap<SubGraphId, ()>> {
    let groups = sub_graph_groups(graph)?;
    let mut dependencies = DiGraphMap::with_capacity(groups.len(), 0);
    for &id in groups.keys() {
        dependencies.add_node(id);
    }
    for edge in graph.list_of_edges() {
        if !graph.is_external(edge) {
            continue;
        }
        let entry = graph.edge(edge);
        if let (Some(producer), Some(consumer)) = (
            graph.sub_graphs().get(entry.col),
            graph.sub_graphs().get(entry.row),
        ) {
            dependencies.add_edge(producer, consumer, ());
        }
    }
    Ok(dependencies)
}

/// Assign a level to every sub-graph.
///
/// Returns the number of levels.
///
/// # Errors
///
/// Returns [`Error::NonDagDependencies`] if the sub-graph dependencies
/// contain a cycle, and [`Error::IncompleteAssignment`] if the graph is not
/// partitioned.
#[instrument(skip_all)]
pub fn organize_levels(graph: &mut DependencyGraph) -> Result<usize> {
    let dependencies = sub_graph_dependencies(graph)?;
    let mut levels: BTreeMap<SubGraphId, SubGraphLevel> = BTreeMap::new();
    let mut pending: Vec<SubGraphId> = dependencies.nodes().collect();
    let mut rank = 0;

    while !pending.is_empty() {
        let next = SubGraphLevel::from_position(rank);
        let ready: Vec<SubGraphId> = pending
            .iter()
            .copied()
            .filter(|&id| {
                dependencies
                    .neighbors_directed(id, Direction::Incoming)
                    .all(|producer| levels.contains_key(&producer))
            })
            .collect();
        if ready.is_empty() {
            return Err(Error::NonDagDependencies {
                unleveled: pending.len(),
            });
        }
        for id in &ready {
            levels.insert(*id, next);
        }
        pending.retain(|id| !levels.contains_key(id));
        rank += 1;
    }

    graph.levels_mut().reset();
    graph.levels_mut().set(levels)?;
    debug!(levels = rank, "Sub-graph levelling complete");
    Ok(rank)
}

/// Group the sub-graphs of a levelled graph by level.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if any sub-graph lacks a level.
pub fn level_groups(graph: &DependencyGraph) -> Result<LevelGroups> {
    let mut groups = LevelGroups::new();
    let mut unassigned = 0;
    for id in sub_graph_groups(graph)?.into_keys() {
        match graph.levels().get(id) {
            Some(level) => groups.entry(level).or_default().push(id),
            None => unassigned += 1,
        }
    }
    if unassigned > 0 {
        return Err(Error::IncompleteAssignment {
            phase: "level grouping",
            unassigned,
        });
    }
    Ok(groups)
}
