//! Schedule-driven forward substitution.
//!
//! The solver compiles a [`Schedule`] and the matrix weights into one
//! [`SubGraphPlan`] per sub-graph, grouped by level. Solving walks the
//! levels in order; the sub-graphs of a level run through a
//! [`BulkExecutor`] and their rows are committed to `x` before the next
//! level starts.

use crate::executor::{BulkExecutor, SequentialExecutor};
use crate::schedule::Schedule;
use crate::{Error, Result};
use amsla_graph::{DependencyGraph, NodeId, SubGraphId, SubGraphLevel, TagKey, TimeSlot};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, trace};

/// Where an update reads its input value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    /// A row owned by the executing sub-graph, by local position.
    Local(usize),
    /// A row committed by an earlier level, by matrix position.
    Shared(usize),
}

/// `x[row] -= Σ weight · x[operand]` for one row.
#[derive(Debug, Clone, PartialEq)]
struct RowUpdate {
    local: usize,
    terms: Vec<(Operand, f64)>,
}

/// The work of one time slot.
#[derive(Debug, Clone, PartialEq, Default)]
struct SlotStep {
    updates: Vec<RowUpdate>,
    /// `(local row, diagonal weight)` divisions applied after the updates.
    scales: Vec<(usize, f64)>,
}

/// Edges of one sub-graph by slot: `(row -> [(col, weight)], [(row, diagonal)])`.
type SlotEdges = BTreeMap<TimeSlot, (BTreeMap<NodeId, Vec<(NodeId, f64)>>, Vec<(NodeId, f64)>)>;

/// Precompiled work of one sub-graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SubGraphPlan {
    sub_graph: SubGraphId,
    rows: Vec<NodeId>,
    steps: Vec<(TimeSlot, SlotStep)>,
}

impl SubGraphPlan {
    /// The sub-graph this plan executes.
    #[must_use]
    pub fn sub_graph(&self) -> SubGraphId {
        self.sub_graph
    }

    /// Rows written by this plan, in ascending order.
    #[must_use]
    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    /// Number of slots, the external slot included.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Run the plan against the committed values `x`.
    ///
    /// Returns the final value of every row of the sub-graph. Within each
    /// slot all sums are computed before any row is written.
    ///
    /// # Panics
    ///
    /// Panics if `x` has fewer entries than the matrix has rows.
    #[must_use]
    pub fn execute(&self, x: &[f64]) -> Vec<(NodeId, f64)> {
        let mut local: Vec<f64> = self.rows.iter().map(|row| x[row.position()]).collect();
        let mut sums = Vec::new();
        for (_, step) in &self.steps {
            sums.clear();
            sums.extend(step.updates.iter().map(|update| {
                update
                    .terms
                    .iter()
                    .map(|&(operand, weight)| {
                        weight
                            * match operand {
                                Operand::Local(position) => local[position],
                                Operand::Shared(position) => x[position],
                            }
                    })
                    .sum::<f64>()
            }));
            for (update, sum) in step.updates.iter().zip(&sums) {
                local[update.local] -= sum;
            }
            for &(position, weight) in &step.scales {
                local[position] /= weight;
            }
        }
        self.rows.iter().copied().zip(local).collect()
    }
}

/// Solves `L x = b` for a scheduled lower-triangular matrix.
///
/// Rows without a diagonal entry are treated as having a unit diagonal.
#[derive(Debug)]
pub struct TriangularSolver<E = SequentialExecutor> {
    dimension: usize,
    levels: Vec<Vec<SubGraphPlan>>,
    executor: E,
}

impl TriangularSolver<SequentialExecutor> {
    /// Compile a solver for `graph`'s matrix from its schedule.
    ///
    /// The schedule is trusted to be complete; [`Schedule::from_graph`]
    /// enforces that when it is built.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the schedule belongs to a
    /// different matrix and [`Error::IncompleteAssignment`] if a scheduled
    /// row has no sub-graph or level.
    #[instrument(skip_all, fields(dimension = graph.dimension()))]
    pub fn new(graph: &DependencyGraph, schedule: &Schedule) -> Result<Self> {
        schedule.check_matches(graph)?;

        let sub_graph_of: HashMap<NodeId, SubGraphId> = schedule
            .nodes
            .iter()
            .map(|tags| (tags.node, tags.sub_graph))
            .collect();
        let level_of: HashMap<SubGraphId, SubGraphLevel> = schedule
            .sub_graphs
            .iter()
            .map(|tags| (tags.sub_graph, tags.level))
            .collect();
        let mut members: BTreeMap<SubGraphId, Vec<NodeId>> = BTreeMap::new();
        for tags in &schedule.nodes {
            members.entry(tags.sub_graph).or_default().push(tags.node);
        }

        let mut slots: BTreeMap<SubGraphId, SlotEdges> = BTreeMap::new();
        let mut orphaned = 0;
        for edge in graph.list_of_edges() {
            let Some(slot) = schedule.time_slot(edge) else {
                continue;
            };
            let entry = graph.edge(edge);
            let Some(&sub_graph) = sub_graph_of.get(&entry.row) else {
                orphaned += 1;
                continue;
            };
            let (updates, scales) = slots.entry(sub_graph).or_default().entry(slot).or_default();
            if entry.is_loop() {
                scales.push((entry.row, entry.weight));
            } else {
                updates.entry(entry.row).or_default().push((entry.col, entry.weight));
            }
        }

        let mut levels: BTreeMap<SubGraphLevel, Vec<SubGraphPlan>> = BTreeMap::new();
        for (sub_graph, mut rows) in members {
            let Some(&level) = level_of.get(&sub_graph) else {
                orphaned += rows.len();
                continue;
            };
            rows.sort_unstable();
            let local_of = |node: NodeId| rows.binary_search(&node).ok();
            let operand = |node: NodeId| {
                local_of(node).map_or(Operand::Shared(node.position()), Operand::Local)
            };

            let mut steps = Vec::new();
            for (slot, (updates, scales)) in slots.remove(&sub_graph).unwrap_or_default() {
                let mut step = SlotStep::default();
                for (row, terms) in updates {
                    let Some(local) = local_of(row) else {
                        orphaned += 1;
                        continue;
                    };
                    step.updates.push(RowUpdate {
                        local,
                        terms: terms
                            .into_iter()
                            .map(|(col, weight)| (operand(col), weight))
                            .collect(),
                    });
                }
                for (row, weight) in scales {
                    match local_of(row) {
                        Some(local) => step.scales.push((local, weight)),
                        None => orphaned += 1,
                    }
                }
                steps.push((slot, step));
            }

            levels.entry(level).or_default().push(SubGraphPlan {
                sub_graph,
                rows,
                steps,
            });
        }

        if orphaned > 0 {
            return Err(Error::IncompleteAssignment {
                phase: "solver planning",
                unassigned: orphaned,
            });
        }

        let levels: Vec<Vec<SubGraphPlan>> = levels.into_values().collect();
        debug!(
            levels = levels.len(),
            sub_graphs = levels.iter().map(Vec::len).sum::<usize>(),
            "Compiled solver plan"
        );
        Ok(Self {
            dimension: graph.dimension(),
            levels,
            executor: SequentialExecutor,
        })
    }
}

impl<E: BulkExecutor> TriangularSolver<E> {
    /// Run the solver's levels on a different executor.
    #[must_use]
    pub fn with_executor<F: BulkExecutor>(self, executor: F) -> TriangularSolver<F> {
        TriangularSolver {
            dimension: self.dimension,
            levels: self.levels,
            executor,
        }
    }

    /// The executor running each level.
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Give back the executor, e.g. to shut it down.
    #[must_use]
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Matrix dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Sub-graph plans, grouped by level in execution order.
    #[must_use]
    pub fn levels(&self) -> &[Vec<SubGraphPlan>] {
        &self.levels
    }

    /// Solve `L x = rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `rhs` does not have one entry
    /// per matrix row, or an executor error.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>> {
        if rhs.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: rhs.len(),
            });
        }

        let mut x = rhs.to_vec();
        for (depth, level) in self.levels.iter().enumerate() {
            let results = self.executor.execute_level(level, &x)?;
            for (row, value) in results.into_iter().flatten() {
                x[row.position()] = value;
            }
            trace!(level = depth + 1, sub_graphs = level.len(), "Committed level");
        }
        Ok(x)
    }
}
