use nerve_core::event_bus::MetricSnapshot;
use nerve_core::{BusConfig, ChannelId, NerveBus, NerveEvent, Signal};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

/// Publish everything, drain, and return (priority, publish index) in delivery order
fn deliver_all(priorities: &[u8], batch_size: usize) -> Vec<(u8, usize)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Should build runtime");

    runtime.block_on(async {
        let bus = NerveBus::with_config(BusConfig::default().with_batch_size(batch_size))
            .expect("Should create bus");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe(ChannelId::SystemMetric, move |event| {
            if let Signal::Metric(m) = event.signal() {
                sink.lock().push((event.priority().level(), m.value as usize));
            }
            Ok(())
        });

        for (index, priority) in priorities.iter().enumerate() {
            bus.publish(NerveEvent::new(
                Signal::Metric(MetricSnapshot::new("prop", index as f64)),
                *priority,
            ));
        }
        bus.drained().await;

        let delivered = seen.lock().clone();
        delivered
    })
}

proptest! {
    #[test]
    fn prop_delivery_is_priority_sorted_and_stable(
        priorities in prop::collection::vec(0u8..=5, 0..200),
        batch_size in 1usize..64,
    ) {
        let delivered = deliver_all(&priorities, batch_size);
        prop_assert_eq!(delivered.len(), priorities.len());

        for pair in delivered.windows(2) {
            let (p0, i0) = pair[0];
            let (p1, i1) = pair[1];
            prop_assert!(p0 > p1 || (p0 == p1 && i0 < i1));
        }
    }
}
