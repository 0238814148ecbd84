//! Built-in transports.
//!
//! - [`LogTransport`] writes each delivered event through `tracing`
//! - [`JsonLinesTransport`] appends each event as one JSON line to a writer
//! - [`RelayTransport`] forwards events into a bounded channel for another task

mod jsonl;
mod log;
mod relay;

pub use self::jsonl::JsonLinesTransport;
pub use self::log::{LogLevel, LogTransport};
pub use self::relay::RelayTransport;
