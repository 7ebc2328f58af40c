//! Progress rendering hook.
//!
//! When `plotProgress` is enabled the analysis hands a read-only view of
//! the graph's tags to a [`ProgressRenderer`] after every phase. Drawing
//! the snapshot is up to the implementor; this crate ships no renderer.

use amsla_graph::{
    ComponentId, DependencyGraph, EdgeId, NodeId, SubGraphId, SubGraphLevel, TagLayer, TimeSlot,
};
use std::fmt;

/// Analysis phase after which a snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Components found (and merged, if enabled).
    Components,
    /// Sub-graphs assigned.
    SubGraphs,
    /// Sub-graph levels assigned.
    Levels,
    /// Time slots assigned.
    TimeSlots,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Components => "components",
            Self::SubGraphs => "sub-graphs",
            Self::Levels => "levels",
            Self::TimeSlots => "time-slots",
        };
        f.write_str(name)
    }
}

/// Read-only view of the tags after one phase.
#[derive(Debug, Clone, Copy)]
pub struct TagSnapshot<'a> {
    phase: Phase,
    graph: &'a DependencyGraph,
}

impl<'a> TagSnapshot<'a> {
    /// Snapshot `graph` as it stands after `phase`.
    #[must_use]
    pub fn new(phase: Phase, graph: &'a DependencyGraph) -> Self {
        Self { phase, graph }
    }

    /// The phase that just finished.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The graph structure, for layout.
    #[must_use]
    pub fn graph(&self) -> &'a DependencyGraph {
        self.graph
    }

    /// Component tags.
    #[must_use]
    pub fn components(&self) -> &'a TagLayer<NodeId, ComponentId> {
        self.graph.components()
    }

    /// Sub-graph tags.
    #[must_use]
    pub fn sub_graphs(&self) -> &'a TagLayer<NodeId, SubGraphId> {
        self.graph.sub_graphs()
    }

    /// Level tags.
    #[must_use]
    pub fn levels(&self) -> &'a TagLayer<SubGraphId, SubGraphLevel> {
        self.graph.levels()
    }

    /// Time-slot tags.
    #[must_use]
    pub fn time_slots(&self) -> &'a TagLayer<EdgeId, TimeSlot> {
        self.graph.time_slots()
    }
}

/// Receives tag snapshots during analysis.
pub trait ProgressRenderer {
    /// Render the current state of the tags.
    fn render(&self, snapshot: &TagSnapshot<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<(Phase, usize)>>);

    impl ProgressRenderer for Recorder {
        fn render(&self, snapshot: &TagSnapshot<'_>) {
            self.0
                .borrow_mut()
                .push((snapshot.phase(), snapshot.components().assigned_count()));
        }
    }

    #[test]
    fn test_snapshot_exposes_layers() {
        let mut graph = DependencyGraph::from_triples(&[1, 2], &[1, 1], &[1.0, 1.0]).unwrap();
        let component = ComponentId::new(1).unwrap();
        graph
            .components_mut()
            .set([(NodeId::new(1).unwrap(), component), (NodeId::new(2).unwrap(), component)])
            .unwrap();

        let recorder = Recorder(RefCell::new(Vec::new()));
        recorder.render(&TagSnapshot::new(Phase::Components, &graph));
        assert_eq!(recorder.0.into_inner(), vec![(Phase::Components, 2)]);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::SubGraphs.to_string(), "sub-graphs");
        assert_eq!(Phase::TimeSlots.to_string(), "time-slots");
    }
}
