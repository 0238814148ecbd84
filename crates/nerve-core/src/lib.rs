//! # Nerve Core
//!
//! In-process, priority-ordered publish/subscribe bus with bounded capacity,
//! backpressure and adaptive load shedding. Organs exchange typed signals
//! through it without direct coupling.

pub mod config;
pub mod error;
pub mod event_bus;
pub mod transports;

pub use config::{BusConfig, DropPolicy};
pub use error::{NerveError, Result};

// Re-export event bus for convenience
pub use event_bus::{
    BusStats, ChannelId, Delivery, EventContext, EventId, EventKind, NerveBus, NerveEvent,
    NerveEventBuilder, Priority, Signal, Subscription, SubscriptionId, SubscriptionScope,
    Transport,
};

pub use transports::{JsonLinesTransport, LogLevel, LogTransport, RelayTransport};
