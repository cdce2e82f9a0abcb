use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use sorttrack::{AssignmentStrategy, HungarianSolver};

fn generate_random_iou_matrix(detections: usize, predictions: usize) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(7);
    Array2::from_shape_fn((detections, predictions), |_| rng.gen_range(0.0..1.0))
}

fn bench_optimal(c: &mut Criterion) {
    for size in [10, 50, 100] {
        let ious = generate_random_iou_matrix(size, size);
        c.bench_function(&format!("optimal_{}x{}", size, size), |b| {
            b.iter(|| {
                HungarianSolver::solve_iou(
                    black_box(ious.view()),
                    black_box(0.3),
                    AssignmentStrategy::Optimal,
                )
            })
        });
    }
}

fn bench_greedy(c: &mut Criterion) {
    let ious = generate_random_iou_matrix(100, 100);
    c.bench_function("greedy_100x100", |b| {
        b.iter(|| {
            HungarianSolver::solve_iou(
                black_box(ious.view()),
                black_box(0.3),
                AssignmentStrategy::Greedy,
            )
        })
    });
}

fn bench_rectangular(c: &mut Criterion) {
    let ious = generate_random_iou_matrix(80, 20);
    c.bench_function("optimal_80x20", |b| {
        b.iter(|| {
            HungarianSolver::solve_iou(
                black_box(ious.view()),
                black_box(0.3),
                AssignmentStrategy::Optimal,
            )
        })
    });
}

criterion_group!(benches, bench_optimal, bench_greedy, bench_rectangular);
criterion_main!(benches);
