//! The analysis pipeline.
//!
//! Runs the phases in order: components, optional component merging,
//! sub-graph partitioning (or a single partition), levelling and time-slot
//! scheduling. Any error clears every tag layer so no partial schedule is
//! ever visible.

use crate::components::{merge_components, partition_components};
use crate::config::ScheduleConfig;
use crate::levels::organize_levels;
use crate::progress::{Phase, ProgressRenderer, TagSnapshot};
use crate::schedule::Schedule;
use crate::scheduler::schedule_time_slots;
use crate::subgraphs::{SubGraphPartitioner, assign_single_partition};
use crate::Result;
use amsla_graph::DependencyGraph;
use tracing::{info, instrument, warn};

/// Computes the schedule of a dependency graph.
pub struct Analyzer<'r> {
    config: ScheduleConfig,
    renderer: Option<&'r dyn ProgressRenderer>,
}

impl std::fmt::Debug for Analyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl<'r> Analyzer<'r> {
    /// Create an analyzer for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if a value is out of range.
    pub fn new(config: ScheduleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            renderer: None,
        })
    }

    /// Attach a renderer that receives a snapshot after every phase when
    /// `plotProgress` is enabled.
    #[must_use]
    pub fn with_renderer(mut self, renderer: &'r dyn ProgressRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Run every phase and return the completed schedule.
    ///
    /// Existing tags are discarded first. On error every tag layer is left
    /// empty.
    ///
    /// # Errors
    ///
    /// Propagates the first phase error; [`crate::Error::PartitioningExhausted`]
    /// means no heuristic could fit a component into the sub-graph capacity.
    #[instrument(
        skip_all,
        fields(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            max_sub_graph_size = self.config.max_sub_graph_size,
        )
    )]
    pub fn analyze(&self, graph: &mut DependencyGraph) -> Result<Schedule> {
        graph.reset_all();
        match self.run_phases(graph) {
            Ok(schedule) => {
                info!(
                    components = schedule.component_count(),
                    sub_graphs = schedule.sub_graph_count(),
                    levels = schedule.level_count(),
                    "Schedule analysis complete"
                );
                Ok(schedule)
            }
            Err(error) => {
                graph.reset_all();
                warn!(%error, "Schedule analysis failed; tags cleared");
                Err(error)
            }
        }
    }

    fn run_phases(&self, graph: &mut DependencyGraph) -> Result<Schedule> {
        partition_components(graph)?;
        if let Some(min_size) = self.config.min_component_size {
            merge_components(graph, min_size)?;
        }
        self.render(Phase::Components, graph);

        if self.config.single_partition {
            assign_single_partition(graph)?;
        } else {
            SubGraphPartitioner::new(self.config.max_sub_graph_size)?.partition(graph)?;
        }
        self.render(Phase::SubGraphs, graph);

        organize_levels(graph)?;
        self.render(Phase::Levels, graph);

        schedule_time_slots(graph, self.config.single_partition)?;
        self.render(Phase::TimeSlots, graph);

        Schedule::from_graph(graph)
    }

    fn render(&self, phase: Phase, graph: &DependencyGraph) {
        if !self.config.plot_progress {
            return;
        }
        if let Some(renderer) = self.renderer {
            renderer.render(&TagSnapshot::new(phase, graph));
        }
    }
}

/// Build a graph from coordinate triples and analyse it.
///
/// # Errors
///
/// Returns a graph error for malformed triples, or any analysis error.
pub fn analyze_triples(
    rows: &[usize],
    cols: &[usize],
    weights: &[f64],
    config: ScheduleConfig,
) -> Result<(DependencyGraph, Schedule)> {
    let mut graph = DependencyGraph::from_triples(rows, cols, weights)?;
    let schedule = Analyzer::new(config)?.analyze(&mut graph)?;
    Ok((graph, schedule))
}
