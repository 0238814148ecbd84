//! Bus configuration
//!
//! Capacity, drop policy, sampling default and drain batch size. The
//! structure is serde-friendly so it can be embedded directly in the
//! settings file.

use serde::{Deserialize, Serialize};

use crate::error::{NerveError, Result};

/// Default maximum number of pending events.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10_000;

/// Default number of events dispatched per drain cycle.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default sample rate applied by [`crate::NerveBus::event`].
pub const DEFAULT_SAMPLE_RATE: f64 = 0.1;

/// What to do when an event is published into a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Evict the current head of the queue, then admit the new event.
    DropOldest,
    /// Evict the lowest-priority resident (earliest on ties), then admit.
    #[default]
    DropLowestPriority,
    /// Reject the new event.
    Block,
}

impl std::fmt::Display for DropPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DropOldest => write!(f, "drop_oldest"),
            Self::DropLowestPriority => write!(f, "drop_lowest_priority"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Configuration for the nerve bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Maximum number of pending events.
    pub max_queue_size: usize,
    /// Admission behaviour when the queue is full.
    pub drop_policy: DropPolicy,
    /// Sample rate preloaded into builders created by the bus.
    pub default_sample_rate: f64,
    /// Events dispatched per drain cycle before yielding.
    pub batch_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            drop_policy: DropPolicy::default(),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BusConfig {
    /// Set the queue capacity
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set the drop policy
    pub fn with_drop_policy(mut self, drop_policy: DropPolicy) -> Self {
        self.drop_policy = drop_policy;
        self
    }

    /// Set the drain batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the default sample rate
    pub fn with_default_sample_rate(mut self, rate: f64) -> Self {
        self.default_sample_rate = rate;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(NerveError::invalid_config("max_queue_size", "must be > 0"));
        }

        if self.batch_size == 0 {
            return Err(NerveError::invalid_config("batch_size", "must be > 0"));
        }

        if !(0.0..=1.0).contains(&self.default_sample_rate) {
            return Err(NerveError::invalid_config(
                "default_sample_rate",
                format!("{} is outside [0, 1]", self.default_sample_rate),
            ));
        }

        Ok(())
    }
}
