//! Tagged breadth-first propagation.
//!
//! Every analysis phase labels nodes the same way: start from a set of
//! labelled seeds, then repeatedly label the children that have become
//! ready. Phases differ only in which nodes are in scope, how the labels of
//! a node's parents combine into its own label, and when to give up. This
//! module provides that traversal once, parameterised by those choices.

use crate::tags::TagKey;
use crate::{DependencyGraph, NodeId};
use std::ops::ControlFlow;

/// A node that has become ready during [`propagate`].
#[derive(Debug)]
pub struct Visit<'a, T> {
    /// The node to label.
    pub node: NodeId,
    /// Breadth-first depth; seeds are at depth 0.
    pub depth: usize,
    /// Labels of the node's in-scope parents, in parent order.
    pub parent_tags: &'a [T],
}

/// Nodes grouped by the step in which they were labelled.
///
/// `layers[0]` holds the seeds; `layers[k]` holds the nodes that became
/// ready once every node in earlier layers was labelled.
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    /// Labelled nodes, one entry per breadth-first step.
    pub layers: Vec<Vec<NodeId>>,
}

impl Propagation {
    /// Total number of nodes visited, seeds included.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }
}

/// Label nodes breadth-first, starting from already-labelled seeds.
///
/// A node is ready when it is in scope, still unlabelled, and every parent
/// that is in scope carries a label. Ready nodes of one step are collected
/// before any of them is labelled, so a step never sees labels written by
/// itself. `assign` receives each ready node with its parents' labels and
/// may rewrite other labels (e.g. to merge groups); returning
/// `ControlFlow::Break` aborts the traversal.
///
/// `labels` is indexed by node position and must cover the graph dimension.
pub fn propagate<T, B, S, A>(
    graph: &DependencyGraph,
    labels: &mut [Option<T>],
    seeds: &[NodeId],
    in_scope: S,
    mut assign: A,
) -> ControlFlow<B, Propagation>
where
    T: Copy,
    S: Fn(NodeId) -> bool,
    A: FnMut(Visit<'_, T>, &mut [Option<T>]) -> ControlFlow<B, T>,
{
    let mut layers = vec![seeds.to_vec()];
    let mut frontier = seeds.to_vec();
    let mut parent_tags = Vec::new();
    let mut depth = 0;

    while !frontier.is_empty() {
        depth += 1;
        let ready: Vec<NodeId> = graph
            .children_of_nodes(&frontier)
            .into_iter()
            .filter(|&child| in_scope(child) && labels[child.position()].is_none())
            .filter(|&child| {
                graph
                    .parents_of_node(child)
                    .iter()
                    .filter(|&&parent| in_scope(parent))
                    .all(|parent| labels[parent.position()].is_some())
            })
            .collect();

        for &node in &ready {
            parent_tags.clear();
            parent_tags.extend(
                graph
                    .parents_of_node(node)
                    .iter()
                    .filter(|&&parent| in_scope(parent))
                    .filter_map(|parent| labels[parent.position()]),
            );
            let visit = Visit {
                node,
                depth,
                parent_tags: &parent_tags,
            };
            match assign(visit, labels) {
                ControlFlow::Continue(tag) => labels[node.position()] = Some(tag),
                ControlFlow::Break(reason) => return ControlFlow::Break(reason),
            }
        }

        if !ready.is_empty() {
            layers.push(ready.clone());
        }
        frontier = ready;
    }

    ControlFlow::Continue(Propagation { layers })
}
