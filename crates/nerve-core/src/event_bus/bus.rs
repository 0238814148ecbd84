//! Nerve bus implementation.
//!
//! Provides the [`NerveBus`] handle. The bus is constructed explicitly and
//! cloned into every organ that needs it; clones share one queue, one set of
//! registries and one set of counters.
//!
//! `publish` never blocks and never delivers inline: it counts the event,
//! runs admission, and when the queue goes from empty to non-empty spawns a
//! drain cycle on the runtime captured at construction. Run the bus on a
//! current-thread runtime to get strict single-threaded cooperative
//! scheduling.

use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Notify;

use crate::config::BusConfig;
use crate::error::{NerveError, Result};

use super::delivery::Delivery;
use super::envelope::{NerveEvent, NerveEventBuilder};
use super::events::{ChannelId, Signal};
use super::pressure::MetabolicPressure;
use super::queue::{Admission, EventQueue};
use super::registry::{handler, Handler, Subscription, SubscriptionRegistry, SubscriptionScope};
use super::stats::{BusStats, StatsCollector};
use super::transport::{Transport, TransportRegistry};

/// State shared by every clone of a bus and by its drain cycles
pub(crate) struct BusInner {
    pub(crate) config: BusConfig,
    pub(crate) runtime: Handle,
    pub(crate) queue: Mutex<EventQueue>,
    pub(crate) registry: Arc<RwLock<SubscriptionRegistry>>,
    pub(crate) transports: RwLock<TransportRegistry>,
    pub(crate) stats: Mutex<StatsCollector>,
    pub(crate) pressure: MetabolicPressure,
    /// Drain cycles spawned and not yet finished.
    pub(crate) active_cycles: AtomicUsize,
    pub(crate) idle: Notify,
}

impl BusInner {
    fn is_idle(&self) -> bool {
        self.active_cycles.load(Ordering::SeqCst) == 0 && self.queue.lock().is_empty()
    }
}

/// Priority-ordered in-process event bus
#[derive(Clone)]
pub struct NerveBus {
    inner: Arc<BusInner>,
}

impl NerveBus {
    /// Create a bus with default configuration on the current tokio runtime
    ///
    /// Delivery is strictly single-threaded only on a current-thread
    /// runtime. On a multi-thread runtime a drain scheduled while another is
    /// still fanning out can run alongside it, so subscribers may be called
    /// concurrently. Construction logs a warning in that case.
    pub fn new() -> Result<Self> {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with custom configuration on the current tokio runtime
    ///
    /// See [`NerveBus::new`] for the runtime flavour requirement.
    pub fn with_config(config: BusConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| NerveError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Create a bus that schedules its drain cycles on the given runtime
    ///
    /// Pass a current-thread runtime handle for single-threaded delivery.
    pub fn with_runtime(config: BusConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;

        if runtime.runtime_flavor() != RuntimeFlavor::CurrentThread {
            tracing::warn!(
                flavor = ?runtime.runtime_flavor(),
                "Nerve bus on a multi-thread runtime, drain cycles may overlap"
            );
        }

        let queue = EventQueue::new(config.max_queue_size, config.drop_policy);
        tracing::debug!(
            max_queue_size = config.max_queue_size,
            drop_policy = %config.drop_policy,
            batch_size = config.batch_size,
            "Nerve bus created"
        );

        Ok(Self {
            inner: Arc::new(BusInner {
                config,
                runtime,
                queue: Mutex::new(queue),
                registry: Arc::new(RwLock::new(SubscriptionRegistry::new())),
                transports: RwLock::new(TransportRegistry::new()),
                stats: Mutex::new(StatsCollector::new()),
                pressure: MetabolicPressure::new(),
                active_cycles: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        })
    }

    /// Start an event whose sampling uses the configured default rate
    pub fn event(&self, signal: Signal) -> NerveEventBuilder {
        NerveEvent::builder(signal).sample_rate(self.inner.config.default_sample_rate)
    }

    /// Publish an event.
    ///
    /// Always returns immediately. The event is counted whatever happens to
    /// it afterwards; a full queue either rejects it (block policy) or
    /// evicts a resident to make room.
    pub fn publish(&self, event: NerveEvent) {
        let event = Arc::new(event);
        self.inner.stats.lock().record_published(&event);

        let (admission, queue_len) = {
            let mut queue = self.inner.queue.lock();
            let admission = queue.offer(Arc::clone(&event));
            (admission, queue.len())
        };

        let mut stats = self.inner.stats.lock();
        stats.observe_queue_len(queue_len);

        match admission {
            Admission::Rejected(rejected) => {
                stats.record_rejected();
                drop(stats);
                tracing::warn!(
                    event_id = %rejected.id(),
                    channel = %rejected.channel_id(),
                    "Queue full, dropping event (block policy)"
                );
            }
            Admission::Enqueued {
                evicted,
                became_non_empty,
            } => {
                if let Some(victim) = evicted {
                    stats.record_evicted();
                    tracing::debug!(
                        event_id = %victim.id(),
                        priority = victim.priority().level(),
                        policy = %self.inner.config.drop_policy,
                        "Evicted pending event to admit {}",
                        event.id()
                    );
                }
                drop(stats);

                if became_non_empty {
                    self.schedule_drain();
                }
            }
        }
    }

    /// Spawn one drain cycle
    fn schedule_drain(&self) {
        self.inner.active_cycles.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(inner.drain());
    }

    /// Subscribe to one channel with a synchronous callback
    pub fn subscribe<F>(&self, channel: ChannelId, callback: F) -> Subscription
    where
        F: Fn(&NerveEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(
            SubscriptionScope::Channel(channel),
            handler(move |event| {
                callback(event.as_ref())?;
                Ok(Delivery::Done)
            }),
        )
    }

    /// Subscribe to one channel with an asynchronous callback.
    ///
    /// The returned future runs in the background; the bus only logs its
    /// failure.
    pub fn subscribe_async<F, Fut>(&self, channel: ChannelId, callback: F) -> Subscription
    where
        F: Fn(Arc<NerveEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(
            SubscriptionScope::Channel(channel),
            handler(move |event| Ok(Delivery::pending(callback(Arc::clone(event))))),
        )
    }

    /// Subscribe to every channel with a synchronous callback
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NerveEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(
            SubscriptionScope::All,
            handler(move |event| {
                callback(event.as_ref())?;
                Ok(Delivery::Done)
            }),
        )
    }

    /// Subscribe to every channel with an asynchronous callback
    pub fn subscribe_all_async<F, Fut>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<NerveEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(
            SubscriptionScope::All,
            handler(move |event| Ok(Delivery::pending(callback(Arc::clone(event))))),
        )
    }

    fn register(&self, scope: SubscriptionScope, handler: Handler) -> Subscription {
        let id = self.inner.registry.write().add(scope, handler);
        tracing::debug!(scope = %scope, "Subscription {} added", id);
        Subscription::new(id, scope, &self.inner.registry)
    }

    /// Register an external sink that receives every delivered event
    pub fn register_transport(&self, transport: Arc<dyn Transport>) {
        let name = transport.name().to_string();
        self.inner.transports.write().register(transport);
        tracing::info!(transport = %name, "Registered transport");
    }

    /// Snapshot of the bus counters
    pub fn stats(&self) -> BusStats {
        let queue_size = self.queue_len();
        self.inner.stats.lock().snapshot(queue_size)
    }

    /// Subscribers on a channel, or global subscribers when `None`
    pub fn subscriber_count(&self, channel: Option<ChannelId>) -> usize {
        let registry = self.inner.registry.read();
        match channel {
            Some(channel) => registry.channel_count(channel),
            None => registry.global_count(),
        }
    }

    /// Channels that currently have at least one subscriber
    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.inner.registry.read().active_channels()
    }

    /// Number of registered transports
    pub fn transport_count(&self) -> usize {
        self.inner.transports.read().len()
    }

    /// Number of pending events
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Set the 0-100 load score that drives shedding
    pub fn set_metabolic_pressure(&self, score: f64) {
        self.inner.pressure.set(score);
    }

    /// Current load score
    pub fn metabolic_pressure(&self) -> f64 {
        self.inner.pressure.get()
    }

    /// Current configuration
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Wait until the queue is empty and no drain cycle is running.
    ///
    /// Background work started by asynchronous subscribers or transports is
    /// not awaited.
    pub async fn drained(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for NerveBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerveBus")
            .field("queue_len", &self.queue_len())
            .field("subscribers", &*self.inner.registry.read())
            .field("transports", &*self.inner.transports.read())
            .field("pressure", &self.metabolic_pressure())
            .field("config", &self.inner.config)
            .finish()
    }
}
