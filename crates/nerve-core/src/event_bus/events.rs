//! Signal definitions for the nerve bus.
//!
//! Every signal an organ may publish is a variant of [`Signal`]. Each variant
//! pins one (channel, kind) pair and carries its own payload type, so
//! subscribers match over a closed set instead of string identifiers.
//! Signals are cloneable and serializable for transports and replay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root enum for all signals carried by the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Signal {
    /// System metric snapshot
    #[serde(rename = "METRIC_SNAPSHOT")]
    Metric(MetricSnapshot),
    /// Governance decision recorded by a core store
    #[serde(rename = "DREAMSTATE_DECISION")]
    Dreamstate(DreamstateDecision),
    /// Outcome of a gateway request
    #[serde(rename = "REQUEST_DECISION")]
    Request(RequestDecision),
    /// Failed or timed-out gateway request
    #[serde(rename = "THREAT_DETECTED")]
    Threat(ThreatReport),
    /// Status of an external integration action
    #[serde(rename = "INTEGRATION_STATUS")]
    Integration(IntegrationStatus),
}

impl Signal {
    /// Channel this signal is published on
    pub fn channel(&self) -> ChannelId {
        match self {
            Signal::Metric(_) => ChannelId::SystemMetric,
            Signal::Dreamstate(_) => ChannelId::DreamstateEvent,
            Signal::Request(_) => ChannelId::HttpRequest,
            Signal::Threat(_) => ChannelId::ShieldEvent,
            Signal::Integration(_) => ChannelId::IntegrationEvent,
        }
    }

    /// Event category of this signal
    pub fn kind(&self) -> EventKind {
        match self {
            Signal::Metric(_) => EventKind::MetricSnapshot,
            Signal::Dreamstate(_) => EventKind::DreamstateDecision,
            Signal::Request(_) => EventKind::RequestDecision,
            Signal::Threat(_) => EventKind::ThreatDetected,
            Signal::Integration(_) => EventKind::IntegrationStatus,
        }
    }

    /// Get a short description of this signal for logging
    pub fn description(&self) -> String {
        match self {
            Signal::Metric(m) => format!("{} = {}", m.metric, m.value),
            Signal::Dreamstate(d) => match &d.key {
                Some(key) => format!("{} on {}", d.action, key),
                None => d.action.clone(),
            },
            Signal::Request(r) => {
                format!("{}:{} in {}ms", r.integration, r.tool_id, r.latency_ms)
            }
            Signal::Threat(t) => format!("{}:{} {}", t.integration, t.tool_id, t.reason),
            Signal::Integration(i) => format!("{} {} ({})", i.integration, i.action, i.status),
        }
    }
}

/// Logical topic an event is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelId {
    /// Metric snapshots.
    SystemMetric,
    /// Governance decisions.
    DreamstateEvent,
    /// Gateway request outcomes.
    HttpRequest,
    /// Threat and failure reports.
    ShieldEvent,
    /// External integration status.
    IntegrationEvent,
}

impl ChannelId {
    /// All known channels
    pub const ALL: [ChannelId; 5] = [
        ChannelId::SystemMetric,
        ChannelId::DreamstateEvent,
        ChannelId::HttpRequest,
        ChannelId::ShieldEvent,
        ChannelId::IntegrationEvent,
    ];

    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::SystemMetric => "SYSTEM_METRIC",
            ChannelId::DreamstateEvent => "DREAMSTATE_EVENT",
            ChannelId::HttpRequest => "HTTP_REQUEST",
            ChannelId::ShieldEvent => "SHIELD_EVENT",
            ChannelId::IntegrationEvent => "INTEGRATION_EVENT",
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event category, used for per-kind stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// See [`MetricSnapshot`].
    MetricSnapshot,
    /// See [`DreamstateDecision`].
    DreamstateDecision,
    /// See [`RequestDecision`].
    RequestDecision,
    /// See [`ThreatReport`].
    ThreatDetected,
    /// See [`IntegrationStatus`].
    IntegrationStatus,
}

impl EventKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MetricSnapshot => "METRIC_SNAPSHOT",
            EventKind::DreamstateDecision => "DREAMSTATE_DECISION",
            EventKind::RequestDecision => "REQUEST_DECISION",
            EventKind::ThreatDetected => "THREAT_DETECTED",
            EventKind::IntegrationStatus => "INTEGRATION_STATUS",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric snapshot payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Dotted metric name, e.g. `envkeeper.sync`.
    pub metric: String,
    /// Primary value.
    pub value: f64,
    /// Secondary breakdown values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, f64>,
}

impl MetricSnapshot {
    /// Create a snapshot with no labels
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
            labels: BTreeMap::new(),
        }
    }

    /// Attach a labelled value
    pub fn with_label(mut self, label: impl Into<String>, value: f64) -> Self {
        self.labels.insert(label.into(), value);
        self
    }
}

/// Governance decision payload.
///
/// Carries the key and its sensitivity, never the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamstateDecision {
    /// Decision action, e.g. `ENV_SECRET_MUTATION`.
    pub action: String,
    /// Subject key, if any.
    pub key: Option<String>,
    /// Sensitivity classification of the subject.
    pub sensitivity: Option<String>,
}

/// Risk classification of a gateway tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl RiskLevel {
    /// Numeric risk score used in event contexts
    pub fn score(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.2,
            RiskLevel::Medium => 0.5,
            RiskLevel::High => 0.8,
            RiskLevel::Critical => 0.95,
        }
    }
}

/// Successful gateway request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDecision {
    /// Integration that handled the request.
    pub integration: String,
    /// Tool that was executed.
    pub tool_id: String,
    /// Execution latency in milliseconds.
    pub latency_ms: u64,
    /// Risk level of the tool.
    pub risk_level: RiskLevel,
}

/// Why a request was reported as a threat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatReason {
    /// The request exceeded its deadline.
    Timeout,
    /// The request completed with an error.
    Failure,
}

impl std::fmt::Display for ThreatReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatReason::Timeout => write!(f, "TIMEOUT"),
            ThreatReason::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Failed gateway request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReport {
    /// Integration that handled the request.
    pub integration: String,
    /// Tool that was executed.
    pub tool_id: String,
    /// Failure classification.
    pub reason: ThreatReason,
    /// Error message, if any.
    pub error: Option<String>,
    /// Execution latency in milliseconds.
    pub latency_ms: u64,
}

/// Integration status payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    /// Integration name, e.g. `vercel`.
    pub integration: String,
    /// Action performed.
    pub action: String,
    /// Result status.
    pub status: String,
    /// Whether the action was a dry run.
    pub dry_run: bool,
    /// Number of sub-actions involved.
    pub actions_count: u32,
}
