//! Time-slot scheduling inside sub-graphs.
//!
//! Every cross-sub-graph edge takes [`TimeSlot::External`]. Inside a
//! sub-graph, nodes are processed in breadth-first layers from the nodes
//! with no internal parents. For each layer the internal entering edges
//! share one slot, and the non-unit diagonal entries of the layer take the
//! slot after it. Slot numbers start at 1 in every sub-graph.

use crate::levels::level_groups;
use crate::subgraphs::sub_graph_groups;
use crate::{Error, Result};
use amsla_graph::{DependencyGraph, EdgeId, NodeId, Propagation, SubGraphId, TimeSlot, propagate};
use rayon::prelude::*;
use std::convert::Infallible;
use std::ops::ControlFlow;
use tracing::{debug, instrument};

/// Slot assignments computed for one sub-graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubGraphSlots {
    /// `(edge, slot)` pairs for every internal edge that needs work.
    pub assignments: Vec<(EdgeId, TimeSlot)>,
    /// Number of numbered slots used.
    pub slot_count: u32,
}

/// Assign a time slot to every edge of a levelled graph.
///
/// Levels are processed in ascending order and the sub-graphs of one level
/// are scheduled in parallel. With `graph_wide` set, every node counts as
/// a member of its sub-graph regardless of its tag, which is how a
/// single-partition graph is scheduled.
///
/// Returns the largest number of slots used by any sub-graph.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if any edge other than a unit
/// diagonal ends up without a slot, or if the graph is not levelled.
#[instrument(skip_all, fields(edges = graph.edge_count(), graph_wide = graph_wide))]
pub fn schedule_time_slots(graph: &mut DependencyGraph, graph_wide: bool) -> Result<u32> {
    let members = sub_graph_groups(graph)?;
    let levels = level_groups(graph)?;
    graph.time_slots_mut().reset();

    let external: Vec<(EdgeId, TimeSlot)> = graph
        .list_of_edges()
        .filter(|&edge| graph.is_external(edge))
        .map(|edge| (edge, TimeSlot::External))
        .collect();
    debug!(external = external.len(), "Scheduled external edges");
    graph.time_slots_mut().set(external)?;

    let mut slot_count = 0;
    for (level, sub_graphs) in &levels {
        let view: &DependencyGraph = graph;
        let scheduled = sub_graphs
            .par_iter()
            .map(|&id| {
                let nodes = members.get(&id).map_or(&[][..], Vec::as_slice);
                schedule_sub_graph(view, id, nodes, graph_wide)
            })
            .collect::<Result<Vec<SubGraphSlots>>>()?;

        for slots in scheduled {
            slot_count = slot_count.max(slots.slot_count);
            graph.time_slots_mut().set(slots.assignments)?;
        }
        debug!(%level, sub_graphs = sub_graphs.len(), "Scheduled level");
    }

    let unassigned = graph
        .list_of_edges()
        .filter(|&edge| !graph.edge(edge).is_unit_loop() && graph.time_slots().get(edge).is_none())
        .count();
    if unassigned > 0 {
        return Err(Error::IncompleteAssignment {
            phase: "time-slot scheduling",
            unassigned,
        });
    }

    debug!(slot_count, "Time-slot scheduling complete");
    Ok(slot_count)
}

/// Compute the slots of one sub-graph without touching the graph's tags.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if breadth-first layering does
/// not reach every member.
pub fn schedule_sub_graph(
    graph: &DependencyGraph,
    id: SubGraphId,
    members: &[NodeId],
    graph_wide: bool,
) -> Result<SubGraphSlots> {
    let in_scope = |node: NodeId| graph_wide || graph.sub_graphs().get(node) == Some(id);
    let roots: Vec<NodeId> = members
        .iter()
        .copied()
        .filter(|&node| !graph.parents_of_node(node).iter().any(|&parent| in_scope(parent)))
        .collect();

    let mut labels: Vec<Option<()>> = vec![None; graph.dimension()];
    for root in &roots {
        labels[root.index() - 1] = Some(());
    }
    let flow: ControlFlow<Infallible, Propagation> =
        propagate(graph, &mut labels, &roots, in_scope, |_, _| ControlFlow::Continue(()));
    let propagation = match flow {
        ControlFlow::Continue(propagation) => propagation,
        ControlFlow::Break(never) => match never {},
    };
    if propagation.visited() != members.len() {
        return Err(Error::IncompleteAssignment {
            phase: "sub-graph layering",
            unassigned: members.len().abs_diff(propagation.visited()),
        });
    }

    let mut slots = SubGraphSlots::default();
    let mut next = 1;
    for layer in &propagation.layers {
        let entering: Vec<EdgeId> = graph
            .entering_edges_of_nodes(layer)
            .into_iter()
            .filter(|&edge| !graph.is_external(edge))
            .collect();
        if !entering.is_empty() {
            slots
                .assignments
                .extend(entering.into_iter().map(|edge| (edge, TimeSlot::Slot(next))));
            next += 1;
        }

        let loops: Vec<EdgeId> = graph
            .loop_edges_of_nodes(layer)
            .into_iter()
            .filter(|&edge| !graph.edge(edge).is_unit_loop())
            .collect();
        if !loops.is_empty() {
            slots
                .assignments
                .extend(loops.into_iter().map(|edge| (edge, TimeSlot::Slot(next))));
            next += 1;
        }
    }
    slots.slot_count = next - 1;
    Ok(slots)
}
