//! Weakly-connected component detection.
//!
//! Components are found by breadth-first label propagation over the
//! dependency graph: each root starts with its own tentative label, a ready
//! node takes the smallest label among its parents, and whenever a node's
//! parents disagree every node holding one of the larger labels is moved to
//! the smallest one. Tentative labels are compacted to `1..=K` at the end.

use crate::{Error, Result};
use amsla_graph::{ComponentId, DependencyGraph, NodeId, TagKey, propagate};
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use tracing::{debug, instrument};

/// Nodes of every component, keyed by component id.
pub type ComponentGroups = BTreeMap<ComponentId, Vec<NodeId>>;

/// Label every node with its weakly-connected component.
///
/// Returns the number of components found.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if propagation stops with nodes
/// still unlabelled.
#[instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn partition_components(graph: &mut DependencyGraph) -> Result<usize> {
    let roots: Vec<NodeId> = graph
        .list_of_nodes()
        .iter()
        .copied()
        .filter(|&node| graph.parents_of_node(node).is_empty())
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; graph.dimension()];
    let mut members: Vec<Vec<NodeId>> = Vec::with_capacity(roots.len());
    for (label, &root) in roots.iter().enumerate() {
        labels[root.position()] = Some(label);
        members.push(vec![root]);
    }

    let flow = propagate(&*graph, &mut labels, &roots, |_| true, |visit, labels| {
        let Some(&smallest) = visit.parent_tags.iter().min() else {
            return ControlFlow::Break(visit.node);
        };
        for &other in visit.parent_tags {
            if other == smallest {
                continue;
            }
            let moved = std::mem::take(&mut members[other]);
            for node in &moved {
                labels[node.position()] = Some(smallest);
            }
            members[smallest].extend(moved);
        }
        members[smallest].push(visit.node);
        ControlFlow::Continue(smallest)
    });
    if let ControlFlow::Break(node) = flow {
        debug!(%node, "Non-root node without labelled parents");
    }

    let unassigned = graph
        .list_of_nodes()
        .iter()
        .filter(|node| labels[node.position()].is_none())
        .count();
    if unassigned > 0 {
        return Err(Error::IncompleteAssignment {
            phase: "component partitioning",
            unassigned,
        });
    }

    // Compact tentative labels in order of first appearance.
    let mut compact: BTreeMap<usize, ComponentId> = BTreeMap::new();
    let mut assignments = Vec::with_capacity(graph.node_count());
    for &node in graph.list_of_nodes() {
        let Some(label) = labels[node.position()] else {
            continue;
        };
        let next = ComponentId::from_position(compact.len());
        let id = *compact.entry(label).or_insert(next);
        assignments.push((node, id));
    }

    let count = compact.len();
    graph.components_mut().reset();
    graph.components_mut().set(assignments)?;
    debug!(components = count, "Component partitioning complete");
    Ok(count)
}

/// Group the nodes of a component-labelled graph by component.
///
/// # Errors
///
/// Returns [`Error::IncompleteAssignment`] if any node lacks a component.
pub fn component_groups(graph: &DependencyGraph) -> Result<ComponentGroups> {
    let mut groups = ComponentGroups::new();
    let mut unassigned = 0;
    for &node in graph.list_of_nodes() {
        match graph.components().get(node) {
            Some(id) => groups.entry(id).or_default().push(node),
            None => unassigned += 1,
        }
    }
    if unassigned > 0 {
        return Err(Error::IncompleteAssignment {
            phase: "component grouping",
            unassigned,
        });
    }
    Ok(groups)
}

/// Nodes packed into one merged component.
struct Bucket {
    nodes: Vec<NodeId>,
    /// Whether smaller components may still be packed into this bucket.
    open: bool,
}

/// Coalesce components smaller than `min_size` into shared components.
///
/// Components are visited largest first. Components of at least `min_size`
/// nodes keep a component of their own; smaller ones are packed first-fit
/// into buckets holding at most `min_size` nodes. A trailing bucket may end
/// up below `min_size` when the small components cannot fill it.
///
/// Returns the number of components after merging.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for a zero `min_size` and
/// [`Error::IncompleteAssignment`] if the graph is not component-labelled.
#[instrument(skip_all, fields(min_size = min_size))]
pub fn merge_components(graph: &mut DependencyGraph, min_size: usize) -> Result<usize> {
    if min_size == 0 {
        return Err(Error::invalid_config("minComponentSize must be positive"));
    }

    let mut components: Vec<Vec<NodeId>> = component_groups(graph)?.into_values().collect();
    // Stable: equal sizes keep component id order.
    components.sort_by_key(|members| std::cmp::Reverse(members.len()));

    let mut buckets: Vec<Bucket> = Vec::new();
    for members in components {
        if members.len() >= min_size {
            buckets.push(Bucket {
                nodes: members,
                open: false,
            });
            continue;
        }
        match buckets
            .iter_mut()
            .find(|bucket| bucket.open && bucket.nodes.len() + members.len() <= min_size)
        {
            Some(bucket) => bucket.nodes.extend(members),
            None => buckets.push(Bucket {
                nodes: members,
                open: true,
            }),
        }
    }

    let placed: usize = buckets.iter().map(|bucket| bucket.nodes.len()).sum();
    if placed != graph.node_count() {
        return Err(Error::IncompleteAssignment {
            phase: "component merging",
            unassigned: graph.node_count().abs_diff(placed),
        });
    }

    let assignments: Vec<(NodeId, ComponentId)> = buckets
        .iter()
        .enumerate()
        .flat_map(|(position, bucket)| {
            let id = ComponentId::from_position(position);
            bucket.nodes.iter().map(move |&node| (node, id))
        })
        .collect();

    let count = buckets.len();
    graph.components_mut().reset();
    graph.components_mut().set(assignments)?;
    debug!(components = count, "Component merging complete");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize) -> NodeId {
        NodeId::new(index).unwrap()
    }

    fn graph(entries: &[(usize, usize)], dimension: usize) -> DependencyGraph {
        let mut rows: Vec<usize> = (1..=dimension).collect();
        let mut cols: Vec<usize> = (1..=dimension).collect();
        for &(row, col) in entries {
            rows.push(row);
            cols.push(col);
        }
        let weights = vec![1.0; rows.len()];
        DependencyGraph::from_triples(&rows, &cols, &weights).unwrap()
    }

    fn sizes(graph: &DependencyGraph) -> Vec<usize> {
        component_groups(graph)
            .unwrap()
            .values()
            .map(Vec::len)
            .collect()
    }

    #[test]
    fn test_disconnected_blocks() {
        // {1, 2, 3} and {4, 5}
        let mut graph = graph(&[(2, 1), (3, 2), (5, 4)], 5);
        assert_eq!(partition_components(&mut graph).unwrap(), 2);

        let groups = component_groups(&graph).unwrap();
        let members: Vec<Vec<NodeId>> = groups.into_values().collect();
        assert_eq!(members, vec![vec![node(1), node(2), node(3)], vec![node(4), node(5)]]);
    }

    #[test]
    fn test_roots_joined_by_common_child_merge() {
        // Roots 1, 2 and 3 meet only through nodes 4 and 5.
        let mut graph = graph(&[(4, 1), (4, 2), (5, 3), (5, 4)], 5);
        assert_eq!(partition_components(&mut graph).unwrap(), 1);

        let ids: Vec<_> = graph.components().iter().map(|(_, id)| id.get()).collect();
        assert_eq!(ids, vec![1; 5]);
    }

    #[test]
    fn test_ids_are_contiguous() {
        let mut graph = graph(&[(3, 1), (6, 5)], 6);
        assert_eq!(partition_components(&mut graph).unwrap(), 4);

        let mut ids: Vec<usize> = graph.components().iter().map(|(_, id)| id.get()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_repartition_is_idempotent() {
        let mut graph = graph(&[(3, 1), (4, 3), (4, 2), (7, 6)], 8);
        partition_components(&mut graph).unwrap();
        let first = component_groups(&graph).unwrap();

        graph.components_mut().reset();
        partition_components(&mut graph).unwrap();
        assert_eq!(component_groups(&graph).unwrap(), first);
    }

    #[test]
    fn test_merge_small_components() {
        // Sizes 8, 2, 1, 1, 1.
        let chain: Vec<(usize, usize)> = (2..=8).map(|row| (row, row - 1)).collect();
        let mut entries = chain;
        entries.push((10, 9));
        let mut graph = graph(&entries, 13);
        assert_eq!(partition_components(&mut graph).unwrap(), 5);

        assert_eq!(merge_components(&mut graph, 3).unwrap(), 3);
        assert_eq!(sizes(&graph), vec![8, 3, 2]);

        let assigned: Vec<NodeId> = graph.components().iter().map(|(node, _)| node).collect();
        assert_eq!(assigned, graph.list_of_nodes());
    }

    #[test]
    fn test_merge_keeps_large_components_apart() {
        let mut graph = graph(&[(2, 1), (4, 3)], 4);
        partition_components(&mut graph).unwrap();
        assert_eq!(merge_components(&mut graph, 2).unwrap(), 2);
        assert_eq!(sizes(&graph), vec![2, 2]);
    }

    #[test]
    fn test_merge_rejects_zero() {
        let mut graph = graph(&[], 2);
        partition_components(&mut graph).unwrap();
        assert!(matches!(
            merge_components(&mut graph, 0),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
