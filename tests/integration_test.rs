//! Correctness properties of the parallel engine
//!
//! - Parallel product equals the sequential triple loop for 1, m·p and 32 threads
//! - Aggregated sum and Frobenius norm agree with direct computation
//! - Requesting more threads than cells clamps without changing the result

use proptest::prelude::*;
use tormenta::{Engine, EngineConfig, Matrix, MAX_THREADS};

const PROPTEST_CASES: u32 = 64;

/// Relative tolerance for the reduction invariants
const REL_TOLERANCE: f64 = 1e-9;

fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix> {
    prop::collection::vec(-100.0f64..100.0, rows * cols)
        .prop_map(move |data| Matrix::from_vec(rows, cols, data).unwrap())
}

/// (A, B) with compatible inner dimension and shapes up to 12
fn operands_strategy() -> impl Strategy<Value = (Matrix, Matrix)> {
    (1usize..=12, 1usize..=12, 1usize..=12)
        .prop_flat_map(|(m, n, p)| (matrix_strategy(m, n), matrix_strategy(n, p)))
}

fn multiply(a: &Matrix, b: &Matrix, threads: usize) -> tormenta::Product {
    Engine::new(EngineConfig::new(threads).unwrap())
        .multiply(a, b)
        .unwrap()
}

fn assert_close(got: f64, want: f64, scale: f64, what: &str) {
    let tolerance = REL_TOLERANCE * scale.max(1.0);
    assert!(
        (got - want).abs() <= tolerance,
        "{what}: got {got}, want {want} (tolerance {tolerance})"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    /// Property: parallel result equals the sequential definition
    #[test]
    fn integration_parallel_matches_sequential((a, b) in operands_strategy()) {
        let expected = a.matmul_sequential(&b).unwrap();
        let cells = a.rows() * b.cols();

        for threads in [1, cells.min(MAX_THREADS), MAX_THREADS] {
            let product = multiply(&a, &b, threads);
            prop_assert_eq!(product.matrix.shape(), expected.shape());
            for (got, want) in product.matrix.as_slice().iter().zip(expected.as_slice()) {
                // identical summation order per cell: results are bit-exact
                prop_assert_eq!(got, want);
            }
        }
    }

    /// Property: aggregated sum and norm match direct computation
    #[test]
    fn integration_reduction_invariants(
        (a, b) in operands_strategy(),
        threads in 1usize..=MAX_THREADS
    ) {
        let product = multiply(&a, &b, threads);
        let c = &product.matrix;

        let direct_sum: f64 = c.as_slice().iter().sum();
        let abs_sum: f64 = c.as_slice().iter().map(|x| x.abs()).sum();
        assert_close(product.statistics.sum, direct_sum, abs_sum, "sum");

        let direct_sq: f64 = c.as_slice().iter().map(|x| x * x).sum();
        assert_close(product.statistics.sum_of_squares, direct_sq, direct_sq, "sum of squares");
        assert_close(
            product.statistics.frobenius_norm,
            direct_sq.sqrt(),
            direct_sq.sqrt(),
            "frobenius norm",
        );
        prop_assert_eq!(product.statistics.contributions, product.workers);
    }

    /// Property: more threads than cells runs exactly `cells` workers
    #[test]
    fn integration_clamping_preserves_result(
        (a, b) in (1usize..=4, 1usize..=6, 1usize..=4)
            .prop_flat_map(|(m, n, p)| (matrix_strategy(m, n), matrix_strategy(n, p))),
        extra in 1usize..=16
    ) {
        let cells = a.rows() * b.cols();
        let requested = (cells + extra).min(MAX_THREADS);
        prop_assume!(requested > cells);

        let clamped = multiply(&a, &b, requested);
        let exact = multiply(&a, &b, cells);

        prop_assert_eq!(clamped.workers, cells);
        prop_assert_eq!(clamped.requested_workers, requested);
        prop_assert!(clamped.is_clamped());
        prop_assert_eq!(&clamped.matrix, &exact.matrix);
        prop_assert_eq!(clamped.statistics.contributions, cells);
    }
}

#[test]
fn integration_concrete_scenario() {
    let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let b = Matrix::from_rows(&[vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
    let product = multiply(&a, &b, 2);

    assert_eq!(
        product.matrix,
        Matrix::from_rows(&[vec![19.0, 22.0], vec![43.0, 50.0]]).unwrap()
    );
    assert_eq!(format!("{:.2}", product.statistics.sum), "134.00");
    assert_eq!(
        format!("{:.6}", product.statistics.frobenius_norm),
        "72.069411"
    );
}

#[test]
fn integration_large_product_all_thread_counts() {
    let (m, n, p) = (37, 23, 41);
    let a = Matrix::from_vec(m, n, (0..m * n).map(|i| (i % 17) as f64 - 8.0).collect()).unwrap();
    let b = Matrix::from_vec(n, p, (0..n * p).map(|i| (i % 13) as f64 * 0.5).collect()).unwrap();
    let expected = a.matmul_sequential(&b).unwrap();

    for threads in 1..=MAX_THREADS {
        let product = multiply(&a, &b, threads);
        assert_eq!(product.matrix, expected, "threads = {threads}");
        assert_eq!(product.workers, threads);
        // integer-valued entries: the reduction is exact regardless of order
        assert_eq!(product.statistics.sum, expected.sum());
    }
}

#[test]
fn integration_vector_shapes() {
    // row vector × column vector, and column × row (outer product)
    let row = Matrix::from_vec(1, 4, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let col = Matrix::from_vec(4, 1, vec![1.0, 1.0, 1.0, 1.0]).unwrap();

    let inner = multiply(&row, &col, 8);
    assert_eq!(inner.matrix.as_slice(), &[10.0]);
    assert_eq!(inner.workers, 1);

    let outer = multiply(&col, &row, 3);
    assert_eq!(outer.matrix.shape(), (4, 4));
    assert_eq!(outer.statistics.sum, 40.0);
    assert_eq!(outer.workers, 3);
}
