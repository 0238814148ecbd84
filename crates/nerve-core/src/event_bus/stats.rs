//! Bus activity counters.
//!
//! Counters only ever grow for the lifetime of the bus. `dropped` is the sum
//! of `rejected`, `evicted` and `shed`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::envelope::NerveEvent;
use super::events::{ChannelId, EventKind};

/// Snapshot of bus statistics.
///
/// Returned by value; mutating it has no effect on the bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Total events published.
    pub published: u64,
    /// Total events that will never be delivered because of capacity or pressure.
    pub dropped: u64,
    /// Events refused by the block policy.
    pub rejected: u64,
    /// Resident events evicted to make room.
    pub evicted: u64,
    /// Events shed during drain under pressure.
    pub shed: u64,
    /// Published events per channel.
    pub by_channel: BTreeMap<ChannelId, u64>,
    /// Published events per kind.
    pub by_kind: BTreeMap<EventKind, u64>,
    /// Published events per priority level.
    pub by_priority: BTreeMap<u8, u64>,
    /// Pending events at snapshot time.
    pub queue_size: usize,
    /// Highest number of simultaneously pending events.
    pub peak_queue_size: usize,
}

/// Mutable counters owned by the bus
#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    stats: BusStats,
}

impl StatsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Count a publish call, whatever its outcome
    pub(crate) fn record_published(&mut self, event: &NerveEvent) {
        let stats = &mut self.stats;
        stats.published += 1;
        *stats.by_channel.entry(event.channel_id()).or_insert(0) += 1;
        *stats.by_kind.entry(event.kind()).or_insert(0) += 1;
        *stats.by_priority.entry(event.priority().level()).or_insert(0) += 1;
    }

    pub(crate) fn record_rejected(&mut self) {
        self.stats.rejected += 1;
        self.stats.dropped += 1;
    }

    pub(crate) fn record_evicted(&mut self) {
        self.stats.evicted += 1;
        self.stats.dropped += 1;
    }

    pub(crate) fn record_shed(&mut self) {
        self.stats.shed += 1;
        self.stats.dropped += 1;
    }

    /// Raise the high-water mark if the queue grew past it
    pub(crate) fn observe_queue_len(&mut self, len: usize) {
        if len > self.stats.peak_queue_size {
            self.stats.peak_queue_size = len;
        }
    }

    /// Copy out the counters together with the live queue length
    pub(crate) fn snapshot(&self, queue_size: usize) -> BusStats {
        BusStats {
            queue_size,
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::events::{MetricSnapshot, Signal};

    fn event(priority: u8) -> NerveEvent {
        NerveEvent::new(Signal::Metric(MetricSnapshot::new("m", 0.0)), priority)
    }

    #[test]
    fn test_record_published() {
        let mut collector = StatsCollector::new();
        collector.record_published(&event(1));
        collector.record_published(&event(1));
        collector.record_published(&event(4));

        let stats = collector.snapshot(0);
        assert_eq!(stats.published, 3);
        assert_eq!(stats.by_channel[&ChannelId::SystemMetric], 3);
        assert_eq!(stats.by_kind[&EventKind::MetricSnapshot], 3);
        assert_eq!(stats.by_priority[&1], 2);
        assert_eq!(stats.by_priority[&4], 1);
    }

    #[test]
    fn test_dropped_is_sum_of_causes() {
        let mut collector = StatsCollector::new();
        collector.record_rejected();
        collector.record_evicted();
        collector.record_shed();
        collector.record_shed();

        let stats = collector.snapshot(0);
        assert_eq!(stats.dropped, 4);
        assert_eq!(stats.dropped, stats.rejected + stats.evicted + stats.shed);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut collector = StatsCollector::new();
        collector.observe_queue_len(3);
        collector.observe_queue_len(1);

        let mut snapshot = collector.snapshot(1);
        snapshot.published = 99;
        assert_eq!(snapshot.peak_queue_size, 3);
        assert_eq!(snapshot.queue_size, 1);
        assert_eq!(collector.snapshot(0).published, 0);
    }

    #[test]
    fn test_stats_serialize_with_named_keys() {
        let mut collector = StatsCollector::new();
        collector.record_published(&event(2));
        let json = serde_json::to_value(collector.snapshot(0)).expect("Should serialize");
        assert_eq!(json["by_channel"]["SYSTEM_METRIC"], 1);
        assert_eq!(json["by_priority"]["2"], 1);
    }
}
