//! # Nerve
//!
//! Service wrapper around the nerve bus: the in-process, priority-ordered
//! publish/subscribe backbone that organs use to exchange telemetry,
//! governance decisions and threat reports.
//!
//! ## Architecture
//!
//! Nerve is organized as a workspace with multiple crates:
//!
//! 1. **nerve-core** - Bus, signal catalogue, queue, shedding, transports
//! 2. **nerve-settings** - Settings file loading, validation and persistence
//! 3. **nerve** - Main binary that wires settings, logging and the bus

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use nerve_core::event_bus::MetricSnapshot;
pub use nerve_core::{
    BusConfig, BusStats, ChannelId, DropPolicy, EventKind, JsonLinesTransport, LogTransport,
    NerveBus, NerveError, NerveEvent, Priority, RelayTransport, Signal, Subscription, Transport,
};
pub use nerve_settings::{LoggingSettings, Settings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Metric published once when the service starts
pub const STARTUP_METRIC: &str = "nerve.startup";

/// Metric published on every heartbeat tick
pub const HEARTBEAT_METRIC: &str = "nerve.heartbeat";

/// Initialize logging from the `[logging]` settings
///
/// Sets up structured logging with:
/// - Console output, human-readable or JSON
/// - The configured level as default directive
/// - RUST_LOG environment variable support on top of it
pub fn init_logging(logging: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = logging.level_filter()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    Ok(())
}

/// Build the bus described by the settings and register its transports
///
/// Must be called from within a tokio runtime.
pub fn build_bus(settings: &Settings) -> anyhow::Result<NerveBus> {
    let bus = NerveBus::with_config(settings.bus.clone())?;

    if settings.transports.log {
        bus.register_transport(Arc::new(LogTransport::new(settings.transports.log_level)));
    }
    if let Some(path) = &settings.transports.jsonl_path {
        bus.register_transport(Arc::new(open_jsonl(path)?));
    }

    Ok(bus)
}

fn open_jsonl(
    path: &Path,
) -> anyhow::Result<JsonLinesTransport<std::io::BufWriter<std::fs::File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(JsonLinesTransport::open(path)?)
}

/// Publish the startup metric
pub fn publish_startup(bus: &NerveBus) {
    let signal = Signal::Metric(
        MetricSnapshot::new(STARTUP_METRIC, 1.0)
            .with_label("max_queue_size", bus.config().max_queue_size as f64)
            .with_label("transports", bus.transport_count() as f64),
    );
    bus.publish(bus.event(signal).priority(Priority::HIGH).sampled(true).build());
}

/// Heartbeat metric carrying queue size and pressure
pub fn heartbeat_signal(bus: &NerveBus) -> Signal {
    Signal::Metric(
        MetricSnapshot::new(HEARTBEAT_METRIC, bus.queue_len() as f64)
            .with_label("pressure", bus.metabolic_pressure())
            .with_label("published", bus.stats().published as f64),
    )
}

/// Publish a heartbeat metric every `period` until the task is aborted
pub fn spawn_heartbeat(bus: NerveBus, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let signal = heartbeat_signal(&bus);
            bus.publish(bus.event(signal).priority(Priority::LOW).sampled(true).build());
        }
    })
}
