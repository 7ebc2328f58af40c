//! Capacity-bounded sub-graph partitioning.
//!
//! Components larger than the sub-graph capacity are split by a heuristic
//! search over root orderings and root spreads. Each attempt is computed
//! into a local buffer and only committed to the graph once it succeeds, so
//! a failed attempt never leaves tags behind.

use crate::components::{ComponentGroups, component_groups};
use crate::{Error, Result};
use amsla_graph::{
    ComponentId, Degree, DependencyGraph, NodeId, SortOrder, SubGraphId, TagKey, propagate,
};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use tracing::{debug, instrument, warn};

/// Nodes of every sub-graph, keyed by sub-graph id.
pub type SubGraphGroups = BTreeMap<SubGraphId, Vec<NodeId>>;

/// Root spreads tried for each sort criterion, as fractions of the id pool.
pub const DENSITIES: [f64; 9] = [
    1.0,
    0.5,
    0.25,
    0.125,
    0.062_5,
    0.031_25,
    0.015_625,
    0.007_812_5,
    0.003_906_25,
];

/// Order in which a component's roots are dealt out to sub-graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    /// Most children first.
    OutdegreeDescending,
    /// Fewest children first.
    OutdegreeAscending,
    /// Most parents first.
    IndegreeDescending,
    /// Fewest parents first.
    IndegreeAscending,
    /// Highest index first.
    IndexDescending,
}

impl SortCriterion {
    /// Every criterion, in the order the partitioner tries them.
    pub const ALL: [Self; 5] = [
        Self::OutdegreeDescending,
        Self::OutdegreeAscending,
        Self::IndegreeDescending,
        Self::IndegreeAscending,
        Self::IndexDescending,
    ];

    fn sort(self, graph: &DependencyGraph, nodes: &[NodeId]) -> Vec<NodeId> {
        match self {
            Self::OutdegreeDescending => {
                graph.sort_by_degree(nodes, Degree::Out, SortOrder::Descending)
            }
            Self::OutdegreeAscending => graph.sort_by_degree(nodes, Degree::Out, SortOrder::Ascending),
            Self::IndegreeDescending => graph.sort_by_degree(nodes, Degree::In, SortOrder::Descending),
            Self::IndegreeAscending => graph.sort_by_degree(nodes, Degree::In, SortOrder::Ascending),
            Self::IndexDescending => graph.sort_by_index_descending(nodes),
        }
    }
}

/// Result of one partitioning attempt.
///
/// A failed attempt is an expected outcome, not an error: the caller moves
/// on to the next heuristic combination. Fatal problems travel as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Every node of the component was placed; slots are component-local.
    Placed(Vec<(NodeId, usize)>),
    /// The attempt ran out of room while placing `node`.
    Retry {
        /// First node that could not be placed.
        node: NodeId,
    },
}

/// Splits components into sub-graphs of bounded size.
#[derive(Debug, Clone, Copy)]
pub struct SubGraphPartitioner {
    max_sub_graph_size: usize,
}

impl SubGraphPartitioner {
    /// Create a partitioner with the given sub-graph capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero capacity.
    pub fn new(max_sub_graph_size: usize) -> Result<Self> {
        if max_sub_graph_size == 0 {
            return Err(Error::invalid_config("maxSubGraphSize must be positive"));
        }
        Ok(Self { max_sub_graph_size })
    }

    /// Capacity of each sub-graph.
    #[must_use]
    pub fn max_sub_graph_size(&self) -> usize {
        self.max_sub_graph_size
    }

    /// Assign every node of a component-labelled graph to a sub-graph.
    ///
    /// Sub-graph ids are contiguous (`1..=S`) and, within a component,
    /// never decrease along a dependency. Returns `S`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartitioningExhausted`] when no heuristic fits a
    /// component into the capacity, and [`Error::IncompleteAssignment`] if
    /// the graph is not component-labelled. The sub-graph layer is left
    /// empty on error.
    #[instrument(skip_all, fields(max_sub_graph_size = self.max_sub_graph_size))]
    pub fn partition(&self, graph: &mut DependencyGraph) -> Result<usize> {
        graph.sub_graphs_mut().reset();
        let groups = component_groups(graph)?;
        let raw = self.partition_groups(graph, &groups)?;

        // Compact pool slots to 1..=S, preserving their order.
        let used: BTreeSet<usize> = raw.iter().map(|&(_, slot)| slot).collect();
        let compact: BTreeMap<usize, SubGraphId> = used
            .into_iter()
            .enumerate()
            .map(|(position, slot)| (slot, SubGraphId::from_position(position)))
            .collect();
        let count = compact.len();
        let assignments = raw
            .into_iter()
            .filter_map(|(node, slot)| compact.get(&slot).map(|&id| (node, id)));
        graph.sub_graphs_mut().set(assignments)?;

        debug!(sub_graphs = count, "Sub-graph partitioning complete");
        Ok(count)
    }

    fn partition_groups(
        &self,
        graph: &DependencyGraph,
        groups: &ComponentGroups,
    ) -> Result<Vec<(NodeId, usize)>> {
        let mut raw = Vec::with_capacity(graph.node_count());
        let mut base = 0;
        for (&component, members) in groups {
            if members.len() <= self.max_sub_graph_size {
                raw.extend(members.iter().map(|&node| (node, base)));
            } else {
                let placed = self.partition_component(graph, component, members)?;
                raw.extend(placed.into_iter().map(|(node, slot)| (node, base + slot)));
            }
            base += members.len();
        }
        Ok(raw)
    }

    /// Try every heuristic combination on one large component.
    fn partition_component(
        &self,
        graph: &DependencyGraph,
        component: ComponentId,
        members: &[NodeId],
    ) -> Result<Vec<(NodeId, usize)>> {
        let mut attempts = 0;
        for criterion in SortCriterion::ALL {
            for density in DENSITIES {
                attempts += 1;
                match self.attempt(graph, component, members, criterion, density)? {
                    AttemptOutcome::Placed(placed) => {
                        debug!(%component, ?criterion, density, attempts, "Component partitioned");
                        return Ok(placed);
                    }
                    AttemptOutcome::Retry { node } => {
                        debug!(%component, ?criterion, density, %node, "Partitioning attempt failed");
                    }
                }
            }
        }

        warn!(
            %component,
            size = members.len(),
            max_sub_graph_size = self.max_sub_graph_size,
            attempts,
            "Every partitioning heuristic failed"
        );
        Err(Error::PartitioningExhausted {
            component: component.get(),
            max_sub_graph_size: self.max_sub_graph_size,
            attempts,
        })
    }

    /// Run one (criterion, density) attempt on a component.
    ///
    /// The component owns a pool of `members.len()` slots. Roots are dealt
    /// cyclically over the lowest `ceil(pool * density)` slots. A node whose
    /// parents share one slot takes the first slot at or above it with room;
    /// a node whose parents straddle several slots must join the highest of
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteAssignment`] if propagation completes
    /// without reaching every member.
    pub fn attempt(
        &self,
        graph: &DependencyGraph,
        component: ComponentId,
        members: &[NodeId],
        criterion: SortCriterion,
        density: f64,
    ) -> Result<AttemptOutcome> {
        let max = self.max_sub_graph_size;
        let pool = members.len();
        let candidates = ((pool as f64 * density).ceil() as usize).clamp(1, pool.max(1));
        let in_component = |node: NodeId| graph.components().get(node) == Some(component);

        let roots: Vec<NodeId> = members
            .iter()
            .copied()
            .filter(|&node| !graph.parents_of_node(node).iter().any(|&parent| in_component(parent)))
            .collect();
        let roots = criterion.sort(graph, &roots);

        let mut occupancy = vec![0_usize; pool];
        let mut labels: Vec<Option<usize>> = vec![None; graph.dimension()];
        for (dealt, &root) in roots.iter().enumerate() {
            let Some(slot) = first_with_room(&occupancy, dealt % candidates, max) else {
                return Ok(AttemptOutcome::Retry { node: root });
            };
            occupancy[slot] += 1;
            labels[root.position()] = Some(slot);
        }

        let flow = propagate(graph, &mut labels, &roots, in_component, |visit, _| {
            let Some(&highest) = visit.parent_tags.iter().max() else {
                return ControlFlow::Break(visit.node);
            };
            let straddles = visit.parent_tags.iter().any(|&slot| slot != highest);
            let target = if straddles {
                (occupancy[highest] < max).then_some(highest)
            } else {
                first_with_room(&occupancy, highest, max)
            };
            match target {
                Some(slot) => {
                    occupancy[slot] += 1;
                    ControlFlow::Continue(slot)
                }
                None => ControlFlow::Break(visit.node),
            }
        });
        if let ControlFlow::Break(node) = flow {
            return Ok(AttemptOutcome::Retry { node });
        }

        let placed: Vec<(NodeId, usize)> = members
            .iter()
            .filter_map(|&node| labels[node.position()].map(|slot| (node, slot)))
            .collect();
        if placed.len() != pool {
            return Err(Error::IncompleteAssignment {
                phase: "sub-graph partitioning",
                unassigned: pool - placed.len(),
            });
        }
        Ok(AttemptOutcome::Placed(placed))
    }
}

fn first_with_room(occupancy: &[usize], from: usize, max: usize) -> Option<usize> {
    (from..occupancy.len()).find(|&slot| occupancy[slot] < max)
}

/// Put every node into sub-graph 1.
///
/// Used when sub-graph partitioning is disabled; the whole graph is then
/// scheduled as one unit. Returns the number of sub-graphs (1, or 0 for an
/// empty graph).
///
/// # Errors
///
/// Propagates tag layer errors.
#[instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn assign_single_partition(graph: &mut DependencyGraph) -> Result<usize> {
    let whole = SubGraphId::from_position(0);
    let nodes = graph.list_of_nodes().to_vec();
    graph.sub_graphs_mut().reset();
    graph
        .sub_graphs_mut()
        .set(nodes.iter().map(|&node| (node, whole)))?;
    Ok(usize::from(!nodes.is_empty()))
}

/// Group the nodes of a partitioned graph by sub-graph.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if any node lacks a sub-graph.
pub fn sub_graph_groups(graph: &DependencyGraph) -> Result<SubGraphGroups> {
    let mut groups = SubGraphGroups::new();
    let mut unassigned = 0;
    for &node in graph.list_of_nodes() {
        match graph.sub_graphs().get(node) {
            Some(id) => groups.entry(id).or_default().push(node),
            None => unassigned += 1,
        }
    }
    if unassigned > 0 {
        return Err(Error::IncompleteAssignment {
            phase: "sub-graph grouping",
            unassigned,
        });
    }
    Ok(groups)
}
