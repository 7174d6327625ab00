// Submission queue benchmarks
//
// Run with: cargo bench -p vex-queue --bench queue_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use vex_queue::{Submission, SubmissionQueue};

fn benchmark_enqueue(c: &mut Criterion) {
    let queue = SubmissionQueue::new();
    let mut id = 0i64;

    c.bench_function("enqueue_single_producer", |b| {
        b.iter(|| {
            id += 1;
            queue.enqueue(black_box(Submission::new(id, "2025-01-01T00:00:00Z")));
        })
    });
}

fn benchmark_concurrent_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_concurrent");

    for producers in [2usize, 8, 32] {
        let per_producer = 1_000;
        group.throughput(Throughput::Elements((producers * per_producer) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let queue = Arc::new(SubmissionQueue::new());
                    let handles: Vec<_> = (0..producers)
                        .map(|p| {
                            let queue = Arc::clone(&queue);
                            thread::spawn(move || {
                                for i in 0..per_producer {
                                    queue.enqueue(Submission::new((p * per_producer + i) as i64, "t"));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                    black_box(queue.count())
                })
            },
        );
    }

    group.finish();
}

fn benchmark_count_under_load(c: &mut Criterion) {
    let queue = SubmissionQueue::new();
    for i in 0..100_000 {
        queue.enqueue(Submission::new(i, "t"));
    }

    c.bench_function("count_100k", |b| b.iter(|| black_box(queue.count())));
}

criterion_group!(
    benches,
    benchmark_enqueue,
    benchmark_concurrent_enqueue,
    benchmark_count_under_load
);
criterion_main!(benches);
