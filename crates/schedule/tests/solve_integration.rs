//! End-to-end solves checked against a dense forward substitution.

use amsla_schedule::{
    CpuExecutor, Error, ScheduleConfig, TriangularSolver, analyze_triples,
};

const ABS_TOLERANCE: f64 = 1e-7;
const REL_TOLERANCE: f64 = 1e-6;

struct Triples {
    rows: Vec<usize>,
    cols: Vec<usize>,
    weights: Vec<f64>,
}

impl Triples {
    fn dimension(&self) -> usize {
        self.rows.iter().copied().max().unwrap_or(0)
    }
}

/// Ten unknowns, eighteen nonzeros, three components:
/// {1..6} with a diamond into node 6, {7, 8} and {9, 10}.
fn ten_node_matrix() -> Triples {
    let diagonal = [3.0, 1.0, 1.0, 1.0, 1.0, 3.0, 1.0, 1.0, 2.0, 1.0];
    let off_diagonal = [
        (2, 1, 0.5),
        (3, 2, -1.0),
        (4, 1, 0.25),
        (5, 4, 2.0),
        (6, 3, 1.5),
        (6, 5, -0.5),
        (8, 7, 0.75),
        (10, 9, 1.25),
    ];

    let mut triples = Triples {
        rows: (1..=10).collect(),
        cols: (1..=10).collect(),
        weights: diagonal.to_vec(),
    };
    for (row, col, weight) in off_diagonal {
        triples.rows.push(row);
        triples.cols.push(col);
        triples.weights.push(weight);
    }
    triples
}

fn dense_forward_solve(triples: &Triples, rhs: &[f64]) -> Vec<f64> {
    let n = triples.dimension();
    let mut dense = vec![vec![0.0; n]; n];
    for i in 0..n {
        dense[i][i] = 1.0;
    }
    for ((&row, &col), &weight) in triples.rows.iter().zip(&triples.cols).zip(&triples.weights) {
        dense[row - 1][col - 1] = weight;
    }

    let mut x = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| dense[i][j] * x[j]).sum();
        x[i] = (rhs[i] - sum) / dense[i][i];
    }
    x
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= ABS_TOLERANCE + REL_TOLERANCE * e.abs(),
            "x[{}] = {} but expected {}",
            index + 1,
            a,
            e
        );
    }
}

fn solve(triples: &Triples, config: ScheduleConfig, rhs: &[f64]) -> Vec<f64> {
    let (graph, schedule) =
        analyze_triples(&triples.rows, &triples.cols, &triples.weights, config).unwrap();
    TriangularSolver::new(&graph, &schedule)
        .unwrap()
        .solve(rhs)
        .unwrap()
}

#[test]
fn test_ten_node_matrix_matches_dense_solve() {
    let triples = ten_node_matrix();
    assert_eq!(triples.rows.len(), 18);

    let rhs = vec![1.0; 10];
    let x = solve(&triples, ScheduleConfig::default(), &rhs);
    assert_close(&x, &dense_forward_solve(&triples, &rhs));
}

#[test]
fn test_disconnected_blocks_solve_independently() {
    // Block A over 1..=3, block B over 4..=6.
    let block_a = Triples {
        rows: vec![1, 2, 3, 2, 3],
        cols: vec![1, 2, 3, 1, 1],
        weights: vec![2.0, 4.0, 5.0, 1.0, -2.0],
    };
    let block_b = Triples {
        rows: vec![1, 2, 3, 2, 3],
        cols: vec![1, 2, 3, 1, 2],
        weights: vec![1.5, 3.0, 0.5, -1.0, 0.25],
    };
    let combined = Triples {
        rows: block_a.rows.iter().copied().chain(block_b.rows.iter().map(|r| r + 3)).collect(),
        cols: block_a.cols.iter().copied().chain(block_b.cols.iter().map(|c| c + 3)).collect(),
        weights: block_a.weights.iter().chain(&block_b.weights).copied().collect(),
    };

    let rhs = [1.0, -2.0, 3.0, 0.5, 4.0, -1.0];
    let (graph, schedule) = analyze_triples(
        &combined.rows,
        &combined.cols,
        &combined.weights,
        ScheduleConfig::default(),
    )
    .unwrap();
    assert_eq!(schedule.component_count(), 2);

    let x = TriangularSolver::new(&graph, &schedule)
        .unwrap()
        .solve(&rhs)
        .unwrap();
    let mut expected = dense_forward_solve(&block_a, &rhs[..3]);
    expected.extend(dense_forward_solve(&block_b, &rhs[3..]));
    assert_close(&x, &expected);
}

#[test]
fn test_bounded_sub_graphs_match_single_partition() {
    let triples = ten_node_matrix();
    let rhs: Vec<f64> = (1..=10).map(|i| f64::from(i) * 0.5).collect();

    let bounded = ScheduleConfig::default().with_max_sub_graph_size(3);
    let (_, schedule) =
        analyze_triples(&triples.rows, &triples.cols, &triples.weights, bounded.clone()).unwrap();
    assert!(schedule.sub_graph_count() >= 3);
    assert!(schedule.level_count() >= 2);

    let partitioned = solve(&triples, bounded, &rhs);
    let single = solve(
        &triples,
        ScheduleConfig::default().with_single_partition(true),
        &rhs,
    );
    assert_close(&partitioned, &single);
    assert_close(&partitioned, &dense_forward_solve(&triples, &rhs));
}

#[test]
fn test_parallel_executor_matches_sequential() {
    let triples = ten_node_matrix();
    let rhs = vec![1.0; 10];
    let config = ScheduleConfig::default()
        .with_max_sub_graph_size(3)
        .with_threads(2);
    let (graph, schedule) =
        analyze_triples(&triples.rows, &triples.cols, &triples.weights, config.clone()).unwrap();

    let sequential = TriangularSolver::new(&graph, &schedule).unwrap();
    let expected = sequential.solve(&rhs).unwrap();

    let parallel = sequential.with_executor(CpuExecutor::from_config(&config).unwrap());
    assert_eq!(parallel.executor().threads(), 2);
    let x = parallel.solve(&rhs).unwrap();
    assert_eq!(x, expected);
    parallel.into_executor().shutdown();
}

#[test]
fn test_unit_capacity_with_two_parent_node_is_exhausted() {
    let triples = ten_node_matrix();
    let result = analyze_triples(
        &triples.rows,
        &triples.cols,
        &triples.weights,
        ScheduleConfig::default().with_max_sub_graph_size(1),
    );

    let Err(error) = result else {
        panic!("partitioning with unit capacity should fail");
    };
    assert!(matches!(error, Error::PartitioningExhausted { component: 1, .. }));
    assert!(error.is_retryable());
}

#[test]
fn test_merged_components_solve_correctly() {
    let triples = ten_node_matrix();
    let rhs = vec![2.0; 10];
    let x = solve(
        &triples,
        ScheduleConfig::default().with_min_component_size(4),
        &rhs,
    );
    assert_close(&x, &dense_forward_solve(&triples, &rhs));
}
