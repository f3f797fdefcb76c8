//! Criterion benchmarks for the pipeline hot paths.
//!
//! Key metrics:
//! - Raw queue hand-off cost (take + give on one queue)
//! - End-to-end drain rate with instant stages, for several pool sizes
//!
//! Run with: cargo bench --bench drain_throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framepipe::{Drain, ImageBuffer, PipelineBuilder, PipelineConfig, StageError};
use framepipe_pool::SlotPool;

/// Benchmark one idle -> pending -> idle round trip with no contention.
///
/// This is the floor for what a stage hand-off costs: two lock/unlock pairs
/// and a condvar notify.
fn queue_handoff(c: &mut Criterion) {
    let pool = SlotPool::<u64, u64, u64>::with_defaults(8).unwrap();

    c.bench_function("queue_handoff", |b| {
        b.iter(|| {
            let slot = pool.idle().try_take().unwrap();
            pool.pending().give(black_box(slot));
            let slot = pool.pending().try_take().unwrap();
            pool.idle().give(slot);
        });
    });
}

/// Benchmark `drain_once` against live workers with 640x480 frames.
fn drain_rate(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_once");
    group.throughput(Throughput::Elements(1));

    for slots in [2usize, 4, 8] {
        let config = PipelineConfig {
            slot_count: slots,
            shutdown_grace_ms: 1,
            ..Default::default()
        };
        let mut pipeline = PipelineBuilder::new(config)
            .acquire(|raw: &mut ImageBuffer, derived: &mut ImageBuffer| {
                raw.reshape(640, 480, 3);
                derived.reshape(320, 240, 3);
                Ok::<(), StageError>(())
            })
            .transform(|derived: &ImageBuffer, len: &mut usize| {
                *len = derived.as_slice().len();
                Ok::<(), StageError>(())
            })
            .present(|raw: &ImageBuffer, _: f32, len: &usize| {
                black_box((raw.width(), *len));
                0
            })
            .start()
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(slots), &slots, |b, _| {
            b.iter(|| loop {
                if let Drain::Presented(code) = pipeline.drain_once() {
                    break black_box(code);
                }
            });
        });

        pipeline.stop();
    }

    group.finish();
}

criterion_group!(benches, queue_handoff, drain_rate);
criterion_main!(benches);
