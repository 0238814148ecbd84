//! Tracing transport.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::event_bus::{Delivery, NerveEvent, Transport};

/// Level at which [`LogTransport`] records events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `tracing::trace!`
    Trace,
    /// `tracing::debug!`
    #[default]
    Debug,
    /// `tracing::info!`
    Info,
    /// `tracing::warn!`
    Warn,
    /// `tracing::error!`
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Transport that logs every delivered event
#[derive(Debug, Clone)]
pub struct LogTransport {
    name: String,
    level: LogLevel,
}

impl LogTransport {
    /// Create a transport named `log` at the given level
    pub fn new(level: LogLevel) -> Self {
        Self {
            name: "log".to_string(),
            level,
        }
    }

    /// Override the transport name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Level events are logged at
    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new(LogLevel::default())
    }
}

macro_rules! log_event {
    ($macro:ident, $event:expr) => {
        tracing::$macro!(
            target: "nerve::transport",
            event_id = %$event.id(),
            channel = %$event.channel_id(),
            kind = %$event.kind(),
            priority = $event.priority().level(),
            "{}",
            $event.signal().description()
        )
    };
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &Arc<NerveEvent>) -> anyhow::Result<Delivery> {
        match self.level {
            LogLevel::Trace => log_event!(trace, event),
            LogLevel::Debug => log_event!(debug, event),
            LogLevel::Info => log_event!(info, event),
            LogLevel::Warn => log_event!(warn, event),
            LogLevel::Error => log_event!(error, event),
        }
        Ok(Delivery::Done)
    }
}
