//! Benchmarks for dependency graph operations
//!
//! Run with: cargo bench -p amsla-graph

#![allow(clippy::unwrap_used)]

use amsla_graph::{Degree, DependencyGraph, NodeId, SortOrder, propagate};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::ops::ControlFlow;

type Triples = (Vec<usize>, Vec<usize>, Vec<f64>);

/// Banded lower-triangular matrix with `bandwidth` sub-diagonals
fn banded_triples(dimension: usize, bandwidth: usize) -> Triples {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut weights = Vec::new();

    for row in 1..=dimension {
        for col in row.saturating_sub(bandwidth).max(1)..=row {
            rows.push(row);
            cols.push(col);
            weights.push(if row == col { 2.0 } else { -0.1 });
        }
    }

    (rows, cols, weights)
}

/// Every row depends on row 1 only
fn arrow_triples(dimension: usize) -> Triples {
    let mut rows = vec![1];
    let mut cols = vec![1];
    let mut weights = vec![1.0];

    for row in 2..=dimension {
        rows.extend([row, row]);
        cols.extend([1, row]);
        weights.extend([0.5, 3.0]);
    }

    (rows, cols, weights)
}

fn benchmark_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");

    for dimension in [100, 1_000, 10_000] {
        let (rows, cols, weights) = banded_triples(dimension, 3);
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &dimension,
            |b, _| {
                b.iter(|| black_box(DependencyGraph::from_triples(&rows, &cols, &weights).unwrap()));
            },
        );
    }

    group.finish();
}

fn benchmark_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency_queries");

    for dimension in [1_000, 10_000] {
        let (rows, cols, weights) = arrow_triples(dimension);
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &dimension,
            |b, _| {
                b.iter(|| {
                    let graph = DependencyGraph::from_triples(&rows, &cols, &weights).unwrap();
                    let nodes = graph.list_of_nodes().to_vec();
                    black_box(graph.children_of_nodes(&nodes))
                });
            },
        );
    }

    group.finish();
}

fn benchmark_degree_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("degree_sort");

    for dimension in [1_000, 10_000] {
        let (rows, cols, weights) = banded_triples(dimension, 5);
        let graph = DependencyGraph::from_triples(&rows, &cols, &weights).unwrap();
        let nodes = graph.list_of_nodes().to_vec();
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &dimension,
            |b, _| {
                b.iter(|| black_box(graph.sort_by_degree(&nodes, Degree::Out, SortOrder::Descending)));
            },
        );
    }

    group.finish();
}

fn benchmark_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    for (dimension, bandwidth) in [(1_000, 1), (1_000, 8), (10_000, 3)] {
        let label = format!("n{dimension}_b{bandwidth}");
        let (rows, cols, weights) = banded_triples(dimension, bandwidth);
        let graph = DependencyGraph::from_triples(&rows, &cols, &weights).unwrap();
        let root = NodeId::new(1).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(&label), &label, |b, _| {
            b.iter(|| {
                let mut labels = vec![None; graph.dimension()];
                labels[0] = Some(0_usize);
                let result: ControlFlow<(), _> = propagate(
                    &graph,
                    &mut labels,
                    &[root],
                    |_| true,
                    |visit, _| ControlFlow::Continue(visit.depth),
                );
                black_box(result)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_graph_construction,
    benchmark_adjacency,
    benchmark_degree_sort,
    benchmark_propagation,
);

criterion_main!(benches);
