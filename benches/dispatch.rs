use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use throttle_queue::{BurstThrottle, CapacityThrottle, Throttle};

fn benchmark_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = runtime.enter();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    let hits = Arc::new(AtomicU64::new(0));
    let counter = {
        let hits = hits.clone();
        move |n: u64| {
            hits.fetch_add(black_box(n), Ordering::Relaxed);
        }
    };

    // Every call after the first lands in the queue
    group.bench_function("fixed_enqueue", |b| {
        let throttle = Throttle::new(counter.clone(), Duration::from_secs(3600)).unwrap();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(throttle.call(black_box(n)))
        });
    });

    group.bench_function("burst_enqueue", |b| {
        let throttle = BurstThrottle::new(
            counter.clone(),
            10,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        )
        .unwrap();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(throttle.call(black_box(n)))
        });
    });

    // Window short enough that the history never fills, so every call runs
    group.bench_function("capacity_immediate", |b| {
        let throttle =
            CapacityThrottle::new(counter.clone(), u32::MAX as usize, Duration::from_millis(1))
                .unwrap();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(throttle.call(black_box(n)))
        });
    });

    group.finish();
    black_box(hits.load(Ordering::Relaxed));
}

criterion_group!(benches, benchmark_dispatch);
criterion_main!(benches);
