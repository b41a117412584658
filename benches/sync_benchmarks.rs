//! Hot paths of the save cycle: diffing, acknowledging and merging.

mod common;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use sync_engine::{reconcile, Changeset, FillPlan, SaveOutcome, ScoringMode};

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("Diff");
    group.measurement_time(Duration::from_secs(5));

    for size in [50, 500, 5_000] {
        let store = common::create_dirty_store(size, 3);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(Changeset::diff(store).unwrap()))
        });
    }
    group.finish();
}

fn bench_acknowledge(c: &mut Criterion) {
    let mut group = c.benchmark_group("Acknowledge");

    for size in [50, 500, 5_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let store = common::create_dirty_store(size, 2);
                    let changeset = Changeset::diff(&store).unwrap();
                    let outcome = SaveOutcome::all_saved(&changeset.entries);
                    (store, changeset, outcome)
                },
                |(mut store, changeset, outcome)| {
                    black_box(store.acknowledge(&changeset, &outcome).unwrap())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_merge_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("MergeRefresh");

    for size in [50, 500, 5_000] {
        let fixtures = common::create_fixtures(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || common::create_dirty_store(size, 4),
                |mut store| black_box(store.merge_fixtures(&fixtures).unwrap()),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_random_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("RandomFill");
    let store = common::create_store(500);
    let ids = store.open_fixtures();

    for mode in [ScoringMode::Score, ScoringMode::Outcome] {
        group.bench_function(format!("{mode:?}"), |b| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| black_box(FillPlan::generate(&ids, mode, &mut rng)))
        });
    }
    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let inputs = [("3", None), ("34", Some(3)), ("43", Some(3)), ("56", Some(1)), ("", Some(2))];
    c.bench_function("Reconcile", |b| {
        b.iter(|| {
            for (raw, current) in inputs {
                black_box(reconcile(black_box(raw), current));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_diff,
    bench_acknowledge,
    bench_merge_refresh,
    bench_random_fill,
    bench_reconcile
);
criterion_main!(benches);
