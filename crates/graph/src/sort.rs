//! Degree-based node orderings.
//!
//! Sorts are stable: nodes with equal degree keep ascending index order.

use crate::{DependencyGraph, NodeId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Which degree to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Degree {
    /// Number of children (exiting edges).
    Out,
    /// Number of parents (entering edges).
    In,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest degree first.
    Ascending,
    /// Largest degree first.
    Descending,
}

impl DependencyGraph {
    /// Degree of a single node.
    #[must_use]
    pub fn degree(&self, node: NodeId, degree: Degree) -> usize {
        match degree {
            Degree::Out => self.children_of_node(node).len(),
            Degree::In => self.parents_of_node(node).len(),
        }
    }

    /// Sort `nodes` by degree, breaking ties by ascending index.
    #[must_use]
    pub fn sort_by_degree(&self, nodes: &[NodeId], degree: Degree, order: SortOrder) -> Vec<NodeId> {
        let mut sorted = nodes.to_vec();
        match order {
            SortOrder::Ascending => sorted.sort_by_key(|&node| (self.degree(node, degree), node)),
            SortOrder::Descending => {
                sorted.sort_by_key(|&node| (Reverse(self.degree(node, degree)), node));
            }
        }
        sorted
    }

    /// Sort `nodes` by descending index.
    #[must_use]
    pub fn sort_by_index_descending(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut sorted = nodes.to_vec();
        sorted.sort_by_key(|&node| Reverse(node));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize) -> NodeId {
        NodeId::new(index).unwrap()
    }

    /// Roots 1, 2, 3; node 1 feeds 4 and 5, node 3 feeds 5.
    fn graph() -> DependencyGraph {
        DependencyGraph::from_triples(&[4, 5, 5], &[1, 1, 3], &[1.0; 3]).unwrap()
    }

    #[test]
    fn test_outdegree_descending_is_stable() {
        let graph = DependencyGraph::from_triples(&[4, 5, 5, 2], &[1, 1, 3, 2], &[1.0; 4]).unwrap();
        let nodes = [node(3), node(2), node(1)];
        let sorted = graph.sort_by_degree(&nodes, Degree::Out, SortOrder::Descending);
        assert_eq!(sorted, vec![node(1), node(3), node(2)]);
    }

    #[test]
    fn test_outdegree_ascending() {
        let graph = graph();
        let nodes = [node(1), node(3), node(4)];
        let sorted = graph.sort_by_degree(&nodes, Degree::Out, SortOrder::Ascending);
        assert_eq!(sorted, vec![node(4), node(3), node(1)]);
    }

    #[test]
    fn test_indegree_orders() {
        let graph = graph();
        let nodes = [node(5), node(4), node(1)];
        assert_eq!(
            graph.sort_by_degree(&nodes, Degree::In, SortOrder::Descending),
            vec![node(5), node(4), node(1)]
        );
        assert_eq!(
            graph.sort_by_degree(&nodes, Degree::In, SortOrder::Ascending),
            vec![node(1), node(4), node(5)]
        );
    }

    #[test]
    fn test_index_descending() {
        let graph = graph();
        let sorted = graph.sort_by_index_descending(&[node(1), node(5), node(3)]);
        assert_eq!(sorted, vec![node(5), node(3), node(1)]);
    }
}
