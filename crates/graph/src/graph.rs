//! Dependency graph over a sparse lower-triangular matrix.
//!
//! Every matrix index is a node and every nonzero `(row, col, weight)` is an
//! edge. Off-diagonal entries are the entering edge of `row` and the exiting
//! edge of `col`; diagonal entries are loop edges. Nodes and edges live in
//! index-keyed arenas and are never added or removed after construction; the
//! analysis phases only write the tag layers.

use crate::tags::{ComponentId, SubGraphId, SubGraphLevel, TagKey, TagLayer, TimeSlot};
use crate::validation::validate_triples;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::OnceLock;
use tracing::debug;

/// A matrix row/column, addressed by its 1-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a node id from a 1-based matrix index.
    ///
    /// Returns `None` for zero.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index == 0 { None } else { Some(Self(index)) }
    }

    /// The 1-based matrix index of this node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl TagKey for NodeId {
    fn position(self) -> usize {
        self.0 - 1
    }

    fn from_position(position: usize) -> Self {
        Self(position + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A matrix nonzero, addressed by its position in the input triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(usize);

impl EdgeId {
    /// Position of the edge in the input triples.
    #[must_use]
    pub const fn position(self) -> usize {
        self.0
    }
}

impl TagKey for EdgeId {
    fn position(self) -> usize {
        self.0
    }

    fn from_position(position: usize) -> Self {
        Self(position)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One nonzero of the matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Row of the entry; the node whose value this edge updates.
    pub row: NodeId,
    /// Column of the entry; the node this edge reads.
    pub col: NodeId,
    /// Matrix value.
    pub weight: f64,
}

impl Edge {
    /// Whether this is a diagonal entry.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.row == self.col
    }

    /// Whether this is a diagonal entry equal to one (needs no work).
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_unit_loop(&self) -> bool {
        self.is_loop() && self.weight == 1.0
    }
}

/// Dependency graph with cached adjacency and per-phase tag layers.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    dimension: usize,
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
    entering: Vec<Vec<EdgeId>>,
    exiting: Vec<Vec<EdgeId>>,
    loops: Vec<Vec<EdgeId>>,
    parents: OnceLock<Vec<Vec<NodeId>>>,
    children: OnceLock<Vec<Vec<NodeId>>>,
    components: TagLayer<NodeId, ComponentId>,
    sub_graphs: TagLayer<NodeId, SubGraphId>,
    levels: TagLayer<SubGraphId, SubGraphLevel>,
    time_slots: TagLayer<EdgeId, TimeSlot>,
}

impl DependencyGraph {
    /// Build a graph from coordinate triples of a lower-triangular matrix.
    ///
    /// Indices are 1-based. The node set is every index that appears as a
    /// row or a column; the dimension is the largest such index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputShape`] if the sequences differ in length, an
    /// index is zero, an entry lies above the diagonal, a `(row, col)` pair
    /// repeats, or a weight is not finite.
    pub fn from_triples(rows: &[usize], cols: &[usize], weights: &[f64]) -> Result<Self> {
        let dimension = validate_triples(rows, cols, weights).into_result()?;

        let mut present = vec![false; dimension];
        let mut edges = Vec::with_capacity(rows.len());
        let mut entering = vec![Vec::new(); dimension];
        let mut exiting = vec![Vec::new(); dimension];
        let mut loops = vec![Vec::new(); dimension];

        for (position, ((&row, &col), &weight)) in rows.iter().zip(cols).zip(weights).enumerate() {
            let edge = Edge {
                row: NodeId(row),
                col: NodeId(col),
                weight,
            };
            let id = EdgeId(position);
            present[row - 1] = true;
            present[col - 1] = true;
            if edge.is_loop() {
                loops[row - 1].push(id);
            } else {
                entering[row - 1].push(id);
                exiting[col - 1].push(id);
            }
            edges.push(edge);
        }

        let nodes: Vec<NodeId> = present
            .iter()
            .enumerate()
            .filter(|(_, is_present)| **is_present)
            .map(|(position, _)| NodeId::from_position(position))
            .collect();

        debug!(
            dimension,
            nodes = nodes.len(),
            edges = edges.len(),
            "Built dependency graph"
        );

        Ok(Self {
            dimension,
            components: TagLayer::new("component", dimension),
            sub_graphs: TagLayer::new("sub-graph", dimension),
            levels: TagLayer::new("sub-graph-level", 0),
            time_slots: TagLayer::new("time-slot", edges.len()),
            nodes,
            edges,
            entering,
            exiting,
            loops,
            parents: OnceLock::new(),
            children: OnceLock::new(),
        })
    }

    /// Size of the square matrix (largest index seen).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (matrix nonzeros) in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes, in ascending index order.
    #[must_use]
    pub fn list_of_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// All edges, in input order.
    pub fn list_of_edges(&self) -> impl ExactSizeIterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    /// Whether `node` is part of the graph.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.0 <= self.dimension && self.nodes.binary_search(&node).is_ok()
    }

    /// Resolve a 1-based matrix index to a node of this graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if no entry references `index`.
    pub fn node(&self, index: usize) -> Result<NodeId> {
        NodeId::new(index)
            .filter(|&node| self.contains_node(node))
            .ok_or(Error::UnknownNode { index })
    }

    /// The edge stored under `id`.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    /// Weight of a single edge.
    #[must_use]
    pub fn weight_of_edge(&self, id: EdgeId) -> f64 {
        self.edges[id.0].weight
    }

    /// Weights of several edges, in the order given.
    #[must_use]
    pub fn weights_of_edges(&self, ids: &[EdgeId]) -> Vec<f64> {
        ids.iter().map(|&id| self.weight_of_edge(id)).collect()
    }

    /// Off-diagonal edges whose row is `node`.
    #[must_use]
    pub fn entering_edges_of_node(&self, node: NodeId) -> &[EdgeId] {
        &self.entering[node.position()]
    }

    /// Off-diagonal edges whose column is `node`.
    #[must_use]
    pub fn exiting_edges_of_node(&self, node: NodeId) -> &[EdgeId] {
        &self.exiting[node.position()]
    }

    /// Diagonal edges of `node` (at most one for valid input).
    #[must_use]
    pub fn loop_edges_of_node(&self, node: NodeId) -> &[EdgeId] {
        &self.loops[node.position()]
    }

    /// Entering edges of several nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn entering_edges_of_nodes(&self, nodes: &[NodeId]) -> Vec<EdgeId> {
        dedup_preserving_order(
            nodes
                .iter()
                .flat_map(|&node| self.entering_edges_of_node(node).iter().copied()),
        )
    }

    /// Exiting edges of several nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn exiting_edges_of_nodes(&self, nodes: &[NodeId]) -> Vec<EdgeId> {
        dedup_preserving_order(
            nodes
                .iter()
                .flat_map(|&node| self.exiting_edges_of_node(node).iter().copied()),
        )
    }

    /// Loop edges of several nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn loop_edges_of_nodes(&self, nodes: &[NodeId]) -> Vec<EdgeId> {
        dedup_preserving_order(
            nodes
                .iter()
                .flat_map(|&node| self.loop_edges_of_node(node).iter().copied()),
        )
    }

    /// The diagonal weight of `node`, if the matrix stores one.
    #[must_use]
    pub fn loop_weight(&self, node: NodeId) -> Option<f64> {
        self.loop_edges_of_node(node)
            .first()
            .map(|&id| self.weight_of_edge(id))
    }

    /// Columns `j < i` with a nonzero `(i, j)`, in input order.
    #[must_use]
    pub fn parents_of_node(&self, node: NodeId) -> &[NodeId] {
        &self.parents.get_or_init(|| {
            self.entering
                .iter()
                .map(|ids| {
                    dedup_preserving_order(ids.iter().map(|&id| self.edges[id.0].col))
                })
                .collect()
        })[node.position()]
    }

    /// Rows `i > j` with a nonzero `(i, j)`, in input order.
    #[must_use]
    pub fn children_of_node(&self, node: NodeId) -> &[NodeId] {
        &self.children.get_or_init(|| {
            self.exiting
                .iter()
                .map(|ids| {
                    dedup_preserving_order(ids.iter().map(|&id| self.edges[id.0].row))
                })
                .collect()
        })[node.position()]
    }

    /// Parents of several nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn parents_of_nodes(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        dedup_preserving_order(
            nodes
                .iter()
                .flat_map(|&node| self.parents_of_node(node).iter().copied()),
        )
    }

    /// Children of several nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn children_of_nodes(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        dedup_preserving_order(
            nodes
                .iter()
                .flat_map(|&node| self.children_of_node(node).iter().copied()),
        )
    }

    /// Whether an off-diagonal edge connects two different sub-graphs.
    ///
    /// Loop edges and edges whose endpoints are not yet assigned are internal.
    #[must_use]
    pub fn is_external(&self, id: EdgeId) -> bool {
        let edge = self.edge(id);
        match (
            self.sub_graphs.get(edge.row),
            self.sub_graphs.get(edge.col),
        ) {
            (Some(row), Some(col)) => row != col,
            _ => false,
        }
    }

    /// Component tag layer.
    #[must_use]
    pub fn components(&self) -> &TagLayer<NodeId, ComponentId> {
        &self.components
    }

    /// Mutable component tag layer.
    pub fn components_mut(&mut self) -> &mut TagLayer<NodeId, ComponentId> {
        &mut self.components
    }

    /// Sub-graph tag layer.
    #[must_use]
    pub fn sub_graphs(&self) -> &TagLayer<NodeId, SubGraphId> {
        &self.sub_graphs
    }

    /// Mutable sub-graph tag layer.
    pub fn sub_graphs_mut(&mut self) -> &mut TagLayer<NodeId, SubGraphId> {
        &mut self.sub_graphs
    }

    /// Sub-graph level tag layer.
    #[must_use]
    pub fn levels(&self) -> &TagLayer<SubGraphId, SubGraphLevel> {
        &self.levels
    }

    /// Mutable sub-graph level tag layer.
    pub fn levels_mut(&mut self) -> &mut TagLayer<SubGraphId, SubGraphLevel> {
        &mut self.levels
    }

    /// Time-slot tag layer.
    #[must_use]
    pub fn time_slots(&self) -> &TagLayer<EdgeId, TimeSlot> {
        &self.time_slots
    }

    /// Mutable time-slot tag layer.
    pub fn time_slots_mut(&mut self) -> &mut TagLayer<EdgeId, TimeSlot> {
        &mut self.time_slots
    }

    /// Clear every tag layer.
    pub fn reset_all(&mut self) {
        self.components.reset();
        self.sub_graphs.reset();
        self.levels.reset();
        self.time_slots.reset();
    }
}

fn dedup_preserving_order<T: Copy + Eq + Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(*item)).collect()
}
