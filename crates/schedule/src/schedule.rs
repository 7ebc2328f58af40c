//! Persisted schedules.
//!
//! A [`Schedule`] is the complete tag assignment of an analysed matrix in a
//! plain serializable form. It can be saved, reloaded and applied to a
//! freshly built graph of the same matrix, so solves can be repeated
//! without re-running the analysis.

use crate::{Error, Result};
use amsla_graph::{
    ComponentId, DependencyGraph, EdgeId, NodeId, SubGraphId, SubGraphLevel, TagKey, TimeSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Tags of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTags {
    /// The node.
    pub node: NodeId,
    /// Weakly-connected component.
    pub component: ComponentId,
    /// Sub-graph the node belongs to.
    pub sub_graph: SubGraphId,
}

/// Level of one sub-graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGraphTags {
    /// The sub-graph.
    pub sub_graph: SubGraphId,
    /// Its topological level.
    pub level: SubGraphLevel,
}

/// The complete schedule of a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Matrix dimension.
    pub dimension: usize,
    /// Number of nodes in the matrix the schedule was built for.
    pub node_count: usize,
    /// Number of edges in the matrix the schedule was built for.
    pub edge_count: usize,
    /// Per-node tags, in node order.
    pub nodes: Vec<NodeTags>,
    /// Per-sub-graph levels, in sub-graph order.
    pub sub_graphs: Vec<SubGraphTags>,
    /// Time slot of every edge, by edge position; `None` for unit diagonals.
    pub time_slots: Vec<Option<TimeSlot>>,
}

impl Schedule {
    /// Extract the schedule from a fully analysed graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteAssignment`] if any node lacks a component
    /// or sub-graph, any sub-graph lacks a level, or any edge other than a
    /// unit diagonal lacks a time slot.
    pub fn from_graph(graph: &DependencyGraph) -> Result<Self> {
        let mut unassigned = 0;
        let mut nodes = Vec::with_capacity(graph.node_count());
        let mut sub_graphs: BTreeMap<SubGraphId, Option<SubGraphLevel>> = BTreeMap::new();
        for &node in graph.list_of_nodes() {
            match (graph.components().get(node), graph.sub_graphs().get(node)) {
                (Some(component), Some(sub_graph)) => {
                    sub_graphs.insert(sub_graph, graph.levels().get(sub_graph));
                    nodes.push(NodeTags {
                        node,
                        component,
                        sub_graph,
                    });
                }
                _ => unassigned += 1,
            }
        }

        let sub_graphs: Vec<SubGraphTags> = sub_graphs
            .into_iter()
            .filter_map(|(sub_graph, level)| match level {
                Some(level) => Some(SubGraphTags { sub_graph, level }),
                None => {
                    unassigned += 1;
                    None
                }
            })
            .collect();

        let time_slots: Vec<Option<TimeSlot>> = graph
            .list_of_edges()
            .map(|edge| {
                let slot = graph.time_slots().get(edge);
                if slot.is_none() && !graph.edge(edge).is_unit_loop() {
                    unassigned += 1;
                }
                slot
            })
            .collect();

        if unassigned > 0 {
            return Err(Error::IncompleteAssignment {
                phase: "schedule extraction",
                unassigned,
            });
        }

        Ok(Self {
            dimension: graph.dimension(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            nodes,
            sub_graphs,
            time_slots,
        })
    }

    /// Number of sub-graphs.
    #[must_use]
    pub fn sub_graph_count(&self) -> usize {
        self.sub_graphs.len()
    }

    /// Number of levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.sub_graphs
            .iter()
            .map(|tags| tags.level.get())
            .max()
            .unwrap_or(0)
    }

    /// Number of components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|tags| tags.component.get())
            .max()
            .unwrap_or(0)
    }

    /// Time slot of an edge, if it has one.
    #[must_use]
    pub fn time_slot(&self, edge: EdgeId) -> Option<TimeSlot> {
        self.time_slots.get(edge.position()).copied().flatten()
    }

    /// Level of a sub-graph.
    #[must_use]
    pub fn level_of(&self, sub_graph: SubGraphId) -> Option<SubGraphLevel> {
        self.sub_graphs
            .iter()
            .find(|tags| tags.sub_graph == sub_graph)
            .map(|tags| tags.level)
    }

    /// Check that this schedule was built for `graph`'s matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the dimension, node count or
    /// edge count differ.
    pub fn check_matches(&self, graph: &DependencyGraph) -> Result<()> {
        for (expected, actual) in [
            (graph.dimension(), self.dimension),
            (graph.node_count(), self.node_count),
            (graph.edge_count(), self.edge_count),
        ] {
            if expected != actual {
                return Err(Error::DimensionMismatch { expected, actual });
            }
        }
        Ok(())
    }

    /// Restore every tag layer of `graph` from this schedule.
    ///
    /// Existing tags are cleared first. On error the graph is left with
    /// every layer empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the schedule belongs to a
    /// different matrix, or a graph error for a node the matrix lacks.
    pub fn apply_to(&self, graph: &mut DependencyGraph) -> Result<()> {
        self.check_matches(graph)?;
        graph.reset_all();
        if let Err(error) = self.write_layers(graph) {
            graph.reset_all();
            return Err(error);
        }
        debug!(
            sub_graphs = self.sub_graph_count(),
            "Applied persisted schedule"
        );
        Ok(())
    }

    fn write_layers(&self, graph: &mut DependencyGraph) -> Result<()> {
        for tags in &self.nodes {
            if !graph.contains_node(tags.node) {
                return Err(amsla_graph::Error::UnknownNode {
                    index: tags.node.index(),
                }
                .into());
            }
        }
        graph
            .components_mut()
            .set(self.nodes.iter().map(|tags| (tags.node, tags.component)))?;
        graph
            .sub_graphs_mut()
            .set(self.nodes.iter().map(|tags| (tags.node, tags.sub_graph)))?;
        graph
            .levels_mut()
            .set(self.sub_graphs.iter().map(|tags| (tags.sub_graph, tags.level)))?;
        graph.time_slots_mut().set(
            self.time_slots
                .iter()
                .enumerate()
                .filter_map(|(position, slot)| slot.map(|slot| (EdgeId::from_position(position), slot))),
        )?;
        Ok(())
    }

    /// Write the schedule to `path` as pretty-printed JSON.
    ///
    /// The file is written to a sibling temporary path and renamed into
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Serialization`] on failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents).map_err(|source| Error::Io {
            operation: "write",
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, path).map_err(|source| Error::Io {
            operation: "rename",
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), sub_graphs = self.sub_graph_count(), "Saved schedule");
        Ok(())
    }

    /// Read a schedule previously written by [`Schedule::save`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Serialization`] on failure.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            operation: "read",
            path: path.to_path_buf(),
            source,
        })?;
        let schedule: Self = serde_json::from_str(&contents)?;
        info!(path = %path.display(), sub_graphs = schedule.sub_graph_count(), "Loaded schedule");
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize) -> NodeId {
        NodeId::new(index).unwrap()
    }

    /// 1 -> 2 in sub-graph 1, node 3 alone in sub-graph 2 fed by node 2.
    fn tagged() -> DependencyGraph {
        let mut graph = DependencyGraph::from_triples(
            &[1, 2, 3, 2, 3],
            &[1, 2, 3, 1, 2],
            &[2.0, 1.0, 1.0, 0.5, 0.5],
        )
        .unwrap();
        let component = ComponentId::new(1).unwrap();
        let (first, second) = (SubGraphId::new(1).unwrap(), SubGraphId::new(2).unwrap());
        graph
            .components_mut()
            .set([(node(1), component), (node(2), component), (node(3), component)])
            .unwrap();
        graph
            .sub_graphs_mut()
            .set([(node(1), first), (node(2), first), (node(3), second)])
            .unwrap();
        graph
            .levels_mut()
            .set([
                (first, SubGraphLevel::new(1).unwrap()),
                (second, SubGraphLevel::new(2).unwrap()),
            ])
            .unwrap();
        graph
            .time_slots_mut()
            .set([
                (EdgeId::from_position(0), TimeSlot::Slot(1)),
                (EdgeId::from_position(3), TimeSlot::Slot(2)),
                (EdgeId::from_position(4), TimeSlot::External),
            ])
            .unwrap();
        graph
    }

    #[test]
    fn test_extract_and_apply() {
        let graph = tagged();
        let schedule = Schedule::from_graph(&graph).unwrap();
        assert_eq!(schedule.sub_graph_count(), 2);
        assert_eq!(schedule.level_count(), 2);
        assert_eq!(schedule.component_count(), 1);
        assert_eq!(schedule.time_slot(EdgeId::from_position(1)), None);
        assert_eq!(
            schedule.level_of(SubGraphId::new(2).unwrap()),
            SubGraphLevel::new(2)
        );

        let mut fresh = DependencyGraph::from_triples(
            &[1, 2, 3, 2, 3],
            &[1, 2, 3, 1, 2],
            &[2.0, 1.0, 1.0, 0.5, 0.5],
        )
        .unwrap();
        schedule.apply_to(&mut fresh).unwrap();
        assert_eq!(Schedule::from_graph(&fresh).unwrap(), schedule);
    }

    #[test]
    fn test_incomplete_graph_is_rejected() {
        let mut graph = tagged();
        graph.time_slots_mut().reset_keys([EdgeId::from_position(4)]);
        assert!(matches!(
            Schedule::from_graph(&graph),
            Err(Error::IncompleteAssignment { unassigned: 1, .. })
        ));
    }

    #[test]
    fn test_apply_to_other_matrix_is_rejected() {
        let schedule = Schedule::from_graph(&tagged()).unwrap();
        let mut other = DependencyGraph::from_triples(&[1, 2], &[1, 2], &[1.0, 1.0]).unwrap();
        assert!(matches!(
            schedule.apply_to(&mut other),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(other.sub_graphs().is_empty());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let schedule = Schedule::from_graph(&tagged()).unwrap();
        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"subGraph\""));
        assert!(json.contains("\"external\""));
        assert!(json.contains("{\"slot\":2}"));
    }
}
