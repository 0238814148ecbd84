//! # Event Bus Module
//!
//! Priority-ordered publish/subscribe bus through which organs exchange
//! typed signals without knowing about each other.
//!
//! ## Overview
//!
//! - Publishers build a [`NerveEvent`] around a [`Signal`] and call
//!   [`NerveBus::publish`], which never blocks and never fails
//! - A bounded queue keeps pending events sorted by priority and applies the
//!   configured drop policy when full
//! - Drain cycles run on the tokio runtime in batches, shed low-priority
//!   events under metabolic pressure, and fan out to global subscribers,
//!   channel subscribers and transports
//! - Every delivery target is isolated: errors and panics are logged, and
//!   asynchronous work is spawned and never awaited
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nerve_core::event_bus::{ChannelId, MetricSnapshot, NerveBus, Priority, Signal};
//!
//! let bus = NerveBus::new()?;
//!
//! let subscription = bus.subscribe(ChannelId::SystemMetric, |event| {
//!     if let Signal::Metric(metric) = event.signal() {
//!         println!("{} = {}", metric.metric, metric.value);
//!     }
//!     Ok(())
//! });
//!
//! bus.publish(
//!     bus.event(Signal::Metric(MetricSnapshot::new("envkeeper.sync", 12.0)))
//!         .priority(Priority::URGENT)
//!         .cluster_id("ENVKEEPER_CORE")
//!         .sample_rate(1.0)
//!         .build(),
//! );
//!
//! bus.drained().await;
//! subscription.unsubscribe();
//! ```

mod bus;
mod delivery;
mod drain;
mod envelope;
mod events;
mod pressure;
mod queue;
mod registry;
mod stats;
mod transport;

pub use bus::NerveBus;
pub use delivery::Delivery;
pub use envelope::*;
pub use events::*;
pub use pressure::{MetabolicPressure, ShedBand, CRITICAL_PRESSURE, ELEVATED_PRESSURE};
pub use registry::{Subscription, SubscriptionId, SubscriptionScope};
pub use stats::BusStats;
pub use transport::Transport;
