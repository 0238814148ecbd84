//! Drain loop.
//!
//! One cycle removes up to `batch_size` events from the head of the queue,
//! sheds those the current pressure excludes and fans the rest out. If the
//! queue is still non-empty it yields to the runtime before taking the next
//! batch, so a large backlog never monopolises the scheduler.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::bus::BusInner;
use super::delivery::{deliver, DeliveryTarget};
use super::envelope::NerveEvent;
use super::registry::SubscriptionScope;

impl BusInner {
    /// Run one drain cycle to completion
    pub(crate) async fn drain(self: Arc<Self>) {
        loop {
            let batch = self.queue.lock().take_batch(self.config.batch_size);
            tracing::trace!(batch = batch.len(), "Draining batch");

            for event in &batch {
                if let Some(band) = self.pressure.shed_band(event.priority()) {
                    self.stats.lock().record_shed();
                    tracing::debug!(
                        event_id = %event.id(),
                        priority = event.priority().level(),
                        pressure = self.pressure.get(),
                        "Shed event ({} band)",
                        band
                    );
                    continue;
                }
                self.fan_out(event);
            }

            let backlog = self.queue.lock().len();
            if backlog == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        self.active_cycles.fetch_sub(1, Ordering::SeqCst);
        self.idle.notify_waiters();
    }

    /// Deliver to global subscribers, channel subscribers, then transports
    fn fan_out(&self, event: &Arc<NerveEvent>) {
        if !event.is_sampled() {
            tracing::trace!(event_id = %event.id(), "Skipping unsampled event");
            return;
        }

        let channel = event.channel_id();
        let (global, subscribers) = self.registry.read().handlers_for(channel);

        let targets = global
            .into_iter()
            .map(|entry| (SubscriptionScope::All, DeliveryTarget::Global, entry))
            .chain(subscribers.into_iter().map(|entry| {
                (
                    SubscriptionScope::Channel(channel),
                    DeliveryTarget::Channel(channel),
                    entry,
                )
            }));

        for (scope, target, (id, handler)) in targets {
            // An earlier callback may have unsubscribed this one
            if !self.registry.read().contains(scope, id) {
                continue;
            }
            deliver(&self.runtime, target, event, || handler(event));
        }

        let transports = self.transports.read().snapshot();
        for (name, transport) in transports {
            deliver(
                &self.runtime,
                DeliveryTarget::Transport(name),
                event,
                || transport.send(event),
            );
        }
    }
}
