//! Error handling for the nerve bus
//!
//! Publishing never fails; these errors cover construction and configuration
//! of the bus, decoding of events and the I/O performed by the built-in
//! transports.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::event_bus::{ChannelId, EventKind};

/// Main error type for the nerve core crate
#[derive(Error, Debug)]
pub enum NerveError {
    /// The bus was constructed outside of a tokio runtime
    #[error("No tokio runtime available to schedule drain cycles")]
    NoRuntime,

    /// A configuration value is invalid
    #[error("Invalid bus configuration '{key}': {reason}")]
    InvalidConfig {
        /// The configuration key that failed validation.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A decoded event names a channel its signal does not belong to
    #[error("Signal of kind {kind} belongs to channel {expected}, not {channel}")]
    ChannelMismatch {
        /// Channel named by the envelope.
        channel: ChannelId,
        /// Channel fixed by the signal.
        expected: ChannelId,
        /// Kind of the signal.
        kind: EventKind,
    },
}

impl NerveError {
    /// Create a configuration error for the given key
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        NerveError::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using NerveError
pub type Result<T> = std::result::Result<T, NerveError>;
