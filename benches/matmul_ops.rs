use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tormenta::{Engine, EngineConfig, Matrix};

fn operands(m: usize, n: usize, p: usize) -> (Matrix, Matrix) {
    let a = Matrix::from_vec(m, n, (0..m * n).map(|i| (i % 100) as f64).collect()).unwrap();
    let b = Matrix::from_vec(n, p, (0..n * p).map(|i| ((i * 2) % 100) as f64).collect()).unwrap();
    (a, b)
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul_threads");

    // Fixed 256x256 product, varying the worker count
    let (a, b) = operands(256, 256, 256);
    for threads in [1, 2, 4, 8, 16, 32] {
        let mut engine = Engine::new(EngineConfig::new(threads).unwrap());
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |bench, _| {
            bench.iter(|| {
                let product = engine.multiply(black_box(&a), black_box(&b)).unwrap();
                black_box(product);
            });
        });
    }

    group.finish();
}

fn bench_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul_sizes");

    let sizes = vec![
        (16, 16, 16),    // Small: spawn overhead dominates
        (64, 64, 64),
        (128, 128, 128),
        (128, 512, 256), // Rectangular
    ];

    for (m, n, p) in sizes {
        let id = format!("{}x{}_x_{}x{}", m, n, n, p);
        let (a, b) = operands(m, n, p);
        let mut engine = Engine::new(EngineConfig::new(8).unwrap());

        group.bench_with_input(BenchmarkId::new("parallel_8", &id), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| {
                let product = engine.multiply(black_box(a), black_box(b)).unwrap();
                black_box(product);
            });
        });

        group.bench_with_input(BenchmarkId::new("sequential", &id), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| {
                let result = black_box(a).matmul_sequential(black_box(b)).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_thread_scaling, bench_sizes);
criterion_main!(benches);
