//! Publish and drain throughput of the nerve bus.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nerve_core::event_bus::MetricSnapshot;
use nerve_core::{BusConfig, ChannelId, DropPolicy, NerveBus, NerveEvent, Signal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Should build runtime")
}

fn event(i: usize) -> NerveEvent {
    NerveEvent::new(
        Signal::Metric(MetricSnapshot::new("bench", i as f64)),
        (i % 6) as u8,
    )
}

fn bench_publish_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_drain");
    let rt = runtime();

    for count in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let bus = NerveBus::new().expect("Should create bus");
                    let delivered = Arc::new(AtomicU64::new(0));
                    let counter = Arc::clone(&delivered);
                    let _sub = bus.subscribe(ChannelId::SystemMetric, move |_| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    });

                    for i in 0..count {
                        bus.publish(event(i));
                    }
                    bus.drained().await;
                    black_box(delivered.load(Ordering::Relaxed))
                })
            });
        });
    }

    group.finish();
}

fn bench_admission_when_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_when_full");
    let rt = runtime();

    for policy in [
        DropPolicy::DropOldest,
        DropPolicy::DropLowestPriority,
        DropPolicy::Block,
    ] {
        group.bench_function(policy.to_string(), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let bus = NerveBus::with_config(
                        BusConfig::default()
                            .with_max_queue_size(256)
                            .with_drop_policy(policy),
                    )
                    .expect("Should create bus");

                    for i in 0..1_024 {
                        bus.publish(event(i));
                    }
                    bus.drained().await;
                    black_box(bus.stats().dropped)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_publish_drain, bench_admission_when_full);
criterion_main!(benches);
