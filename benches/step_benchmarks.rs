//! Benchmarks for the ragdoll solver tick.
//!
//! Run with: cargo bench

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sim_ragdoll::{biped, Skeleton, SolverConfig, Stepper, VerletSolver};

const DT: f64 = 1.0 / 120.0;

fn bench_solver_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_step");

    for (label, config) in [
        ("free_fall", SolverConfig::free_fall()),
        ("tethered", SolverConfig::tethered()),
    ] {
        let solver = VerletSolver::new(config);
        group.bench_function(label, |b| {
            let mut skeleton = Skeleton::biped();
            b.iter(|| {
                let stats = solver
                    .step(black_box(&mut skeleton), DT)
                    .unwrap_or_default();
                black_box(stats)
            });
        });
    }

    group.finish();
}

fn bench_iteration_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration_counts");

    for iterations in [5, 15, 50] {
        let solver = VerletSolver::new(SolverConfig {
            iterations,
            ..SolverConfig::tethered()
        });
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, _| {
                let mut skeleton = Skeleton::biped();
                b.iter(|| {
                    let stats = solver
                        .step(black_box(&mut skeleton), DT)
                        .unwrap_or_default();
                    black_box(stats)
                });
            },
        );
    }

    group.finish();
}

fn bench_actuated_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("actuated_frame");

    // A full 60 Hz display frame: actuate two muscles, drain two substeps.
    let solver = VerletSolver::new(SolverConfig::tethered());
    group.bench_function("60hz_frame", |b| {
        let mut skeleton = Skeleton::biped();
        let mut stepper = Stepper::new();
        b.iter(|| {
            skeleton.adjust_muscle(biped::QUADRICEPS_LEFT, true, 1.0 / 60.0);
            skeleton.adjust_muscle(biped::HAMSTRING_RIGHT, false, 1.0 / 60.0);
            let steps = stepper
                .advance(&solver, black_box(&mut skeleton), 1.0 / 60.0)
                .unwrap_or_default();
            black_box(steps)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_solver_step,
    bench_iteration_counts,
    bench_actuated_frame
);
criterion_main!(benches);
