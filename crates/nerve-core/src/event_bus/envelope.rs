//! Event envelope.
//!
//! A [`NerveEvent`] is the immutable unit flowing through the bus: a unique
//! id, a [`Signal`] (which fixes channel and kind), a priority, a context
//! carrying the sampling decision, and a creation timestamp. Once built it is
//! only ever shared behind an `Arc`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NerveError;

use super::events::{ChannelId, EventKind, Signal};

/// Unique identifier of a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new unique event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Urgency of an event; higher drains first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Telemetry-class signals, first to be shed.
    pub const TELEMETRY: Priority = Priority(0);
    /// Low urgency.
    pub const LOW: Priority = Priority(1);
    /// Normal urgency.
    pub const NORMAL: Priority = Priority(2);
    /// High urgency, survives critical pressure.
    pub const HIGH: Priority = Priority(3);
    /// Urgent.
    pub const URGENT: Priority = Priority(4);
    /// Critical.
    pub const CRITICAL: Priority = Priority(5);

    /// Create a priority from a raw level
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Raw level
    pub const fn level(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Priority {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Producer-side context attached to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// When false the event is counted but never delivered.
    pub sampled: bool,
    /// Correlation id of the originating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Cluster (organ) that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    /// Access tier of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_id: Option<String>,
    /// Citizen (identity) of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<String>,
    /// Risk score in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Estimated cost in dollars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
}

impl Default for EventContext {
    fn default() -> Self {
        Self {
            sampled: true,
            trace_id: None,
            cluster_id: None,
            tier_id: None,
            citizen_id: None,
            risk_score: None,
            cost_estimate: None,
        }
    }
}

/// Immutable event envelope
///
/// Decoding rejects an envelope whose `channel_id` differs from the channel
/// fixed by its signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNerveEvent")]
pub struct NerveEvent {
    id: EventId,
    channel_id: ChannelId,
    priority: Priority,
    context: EventContext,
    signal: Signal,
    timestamp: DateTime<Utc>,
}

/// Wire form of [`NerveEvent`] before the channel check
#[derive(Deserialize)]
struct RawNerveEvent {
    id: EventId,
    channel_id: ChannelId,
    priority: Priority,
    context: EventContext,
    signal: Signal,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawNerveEvent> for NerveEvent {
    type Error = NerveError;

    fn try_from(raw: RawNerveEvent) -> Result<Self, Self::Error> {
        let expected = raw.signal.channel();
        if raw.channel_id != expected {
            return Err(NerveError::ChannelMismatch {
                channel: raw.channel_id,
                expected,
                kind: raw.signal.kind(),
            });
        }

        Ok(Self {
            id: raw.id,
            channel_id: raw.channel_id,
            priority: raw.priority,
            context: raw.context,
            signal: raw.signal,
            timestamp: raw.timestamp,
        })
    }
}

impl NerveEvent {
    /// Create a sampled event with default context
    pub fn new(signal: Signal, priority: impl Into<Priority>) -> Self {
        Self::builder(signal).priority(priority).build()
    }

    /// Start building an event
    pub fn builder(signal: Signal) -> NerveEventBuilder {
        NerveEventBuilder::new(signal)
    }

    /// Unique id
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Channel the event is published on
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Event category
    pub fn kind(&self) -> EventKind {
        self.signal.kind()
    }

    /// Urgency
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Producer context
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Whether the event may be delivered
    pub fn is_sampled(&self) -> bool {
        self.context.sampled
    }

    /// Typed payload
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// How the sampling flag is decided at build time
#[derive(Debug, Clone, Copy)]
enum Sampling {
    Explicit(bool),
    Rate(f64),
}

impl Sampling {
    fn decide(self) -> bool {
        match self {
            Sampling::Explicit(sampled) => sampled,
            Sampling::Rate(rate) if rate >= 1.0 => true,
            Sampling::Rate(rate) if rate > 0.0 => rand::random::<f64>() < rate,
            // Covers NaN as well as non-positive rates.
            Sampling::Rate(_) => false,
        }
    }
}

/// Builder for [`NerveEvent`]
#[derive(Debug, Clone)]
pub struct NerveEventBuilder {
    signal: Signal,
    priority: Priority,
    context: EventContext,
    sampling: Sampling,
}

impl NerveEventBuilder {
    /// Start a builder with normal priority and a sample rate of 1.0
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            priority: Priority::NORMAL,
            context: EventContext::default(),
            sampling: Sampling::Rate(1.0),
        }
    }

    /// Set the priority
    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Force the sampling decision
    pub fn sampled(mut self, sampled: bool) -> Self {
        self.sampling = Sampling::Explicit(sampled);
        self
    }

    /// Decide sampling randomly with the given probability
    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.sampling = Sampling::Rate(rate);
        self
    }

    /// Set the trace id
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.context.trace_id = Some(trace_id.into());
        self
    }

    /// Set the producing cluster
    pub fn cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.context.cluster_id = Some(cluster_id.into());
        self
    }

    /// Set the caller tier
    pub fn tier_id(mut self, tier_id: impl Into<String>) -> Self {
        self.context.tier_id = Some(tier_id.into());
        self
    }

    /// Set the caller citizen id
    pub fn citizen_id(mut self, citizen_id: impl Into<String>) -> Self {
        self.context.citizen_id = Some(citizen_id.into());
        self
    }

    /// Set the risk score, clamped to [0, 1]
    pub fn risk_score(mut self, risk_score: f64) -> Self {
        self.context.risk_score = Some(risk_score.clamp(0.0, 1.0));
        self
    }

    /// Set the estimated cost
    pub fn cost_estimate(mut self, cost: f64) -> Self {
        self.context.cost_estimate = Some(cost);
        self
    }

    /// Finish the event, deciding the sampling flag
    pub fn build(self) -> NerveEvent {
        let mut context = self.context;
        context.sampled = self.sampling.decide();

        NerveEvent {
            id: EventId::new(),
            channel_id: self.signal.channel(),
            priority: self.priority,
            context,
            signal: self.signal,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::events::{IntegrationStatus, MetricSnapshot};

    fn metric() -> Signal {
        Signal::Metric(MetricSnapshot::new("test.metric", 1.0))
    }

    #[test]
    fn test_event_derives_channel_and_kind() {
        let event = NerveEvent::new(metric(), 4);
        assert_eq!(event.channel_id(), ChannelId::SystemMetric);
        assert_eq!(event.kind(), EventKind::MetricSnapshot);
        assert_eq!(event.priority(), Priority::URGENT);
        assert!(event.is_sampled());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = NerveEvent::new(metric(), 1);
        let b = NerveEvent::new(metric(), 1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_sampling_edges() {
        assert!(NerveEvent::builder(metric()).sample_rate(1.0).build().is_sampled());
        assert!(!NerveEvent::builder(metric()).sample_rate(0.0).build().is_sampled());
        assert!(!NerveEvent::builder(metric())
            .sample_rate(f64::NAN)
            .build()
            .is_sampled());
        assert!(!NerveEvent::builder(metric()).sampled(false).build().is_sampled());
    }

    #[test]
    fn test_builder_context() {
        let event = NerveEvent::builder(Signal::Integration(IntegrationStatus {
            integration: "vercel".to_string(),
            action: "cleanup_executed".to_string(),
            status: "ok".to_string(),
            dry_run: true,
            actions_count: 3,
        }))
        .priority(Priority::CRITICAL)
        .trace_id("trace-1")
        .cluster_id("DEPLOYKEEPER_CORE")
        .risk_score(3.0)
        .build();

        assert_eq!(event.channel_id(), ChannelId::IntegrationEvent);
        assert_eq!(event.context().trace_id.as_deref(), Some("trace-1"));
        assert_eq!(event.context().cluster_id.as_deref(), Some("DEPLOYKEEPER_CORE"));
        assert_eq!(event.context().risk_score, Some(1.0));
    }

    #[test]
    fn test_event_serialization() {
        let event = NerveEvent::builder(metric()).priority(3).trace_id("t").build();
        let json = serde_json::to_value(&event).expect("Should serialize");
        assert_eq!(json["channel_id"], "SYSTEM_METRIC");
        assert_eq!(json["signal"]["kind"], "METRIC_SNAPSHOT");
        assert_eq!(json["priority"], 3);

        let parsed: NerveEvent = serde_json::from_value(json).expect("Should deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_decoding_rejects_foreign_channel() {
        let event = NerveEvent::new(metric(), 2);
        let mut json = serde_json::to_value(&event).expect("Should serialize");
        json["channel_id"] = serde_json::json!("SHIELD_EVENT");

        let err = serde_json::from_value::<NerveEvent>(json).expect_err("Should reject");
        assert!(err.to_string().contains("belongs to channel SYSTEM_METRIC"));
    }
}
