//! Benchmark for Future: chained dispatch, fan-out and adoption.

use cancelable::future::{Future, OnFulfilled, OnRejected, Resolution};
use cancelable::scheduler::MicrotaskQueue;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// =============================================================================
// Chain Benchmarks
// =============================================================================

fn benchmark_then_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("then_chain");

    for length in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("length", length),
            &length,
            |bencher, &length| {
                bencher.iter(|| {
                    let queue = MicrotaskQueue::new();
                    let source: Future<u64, String> = Future::resolved_in(queue.clone(), 0);
                    let tail =
                        (0..length).fold(source, |future, _| future.then(|value| Ok(value + 1)));
                    queue.run_until_idle();
                    black_box(tail.value())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Fan-out Benchmarks
// =============================================================================

fn benchmark_fan_out(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("fan_out");

    for subscribers in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |bencher, &subscribers| {
                bencher.iter(|| {
                    let queue = MicrotaskQueue::new();
                    let source: Future<u64, String> = Future::resolved_in(queue.clone(), 1);
                    let children: Vec<_> = (0..subscribers)
                        .map(|_| source.then(|value| Ok(value * 2)))
                        .collect();
                    queue.run_until_idle();
                    black_box(children.len())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Adoption Benchmarks
// =============================================================================

fn benchmark_adoption(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("adoption");

    for depth in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("foreign_depth", depth),
            &depth,
            |bencher, &depth| {
                bencher.iter(|| {
                    let mut resolution: Resolution<u64, String> = Resolution::Value(7);
                    for _ in 0..depth {
                        let inner = resolution;
                        resolution = Resolution::adopt(
                            move |on_fulfilled: OnFulfilled<u64, String>, _: OnRejected<String>| {
                                on_fulfilled(inner);
                            },
                        );
                    }
                    let queue = MicrotaskQueue::new();
                    let future: Future<u64, String> =
                        Future::new_in(queue, move |settle, _| settle.settle(resolution));
                    black_box(future.value())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("future_depth", depth),
            &depth,
            |bencher, &depth| {
                bencher.iter(|| {
                    let queue = MicrotaskQueue::new();
                    let mut current: Future<u64, String> = Future::resolved_in(queue.clone(), 7);
                    for _ in 0..depth {
                        let inner = current;
                        current =
                            Future::new_in(queue.clone(), move |settle, _| settle.adopt(inner));
                    }
                    queue.run_until_idle();
                    black_box(current.value())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_then_chain,
    benchmark_fan_out,
    benchmark_adoption
);
criterion_main!(benches);
