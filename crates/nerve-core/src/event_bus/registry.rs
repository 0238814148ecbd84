//! Subscription registry.
//!
//! Holds global subscribers and per-channel subscriber lists, each in
//! registration order. A channel entry exists only while it has at least
//! one subscriber.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use super::delivery::Delivery;
use super::envelope::NerveEvent;
use super::events::ChannelId;

/// Type alias for subscriber callbacks as stored by the registry
pub(crate) type Handler =
    Arc<dyn Fn(&Arc<NerveEvent>) -> anyhow::Result<Delivery> + Send + Sync>;

/// Box a callback as a registry handler
pub(crate) fn handler<F>(f: F) -> Handler
where
    F: Fn(&Arc<NerveEvent>) -> anyhow::Result<Delivery> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Unique handle identifying a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// What a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// Every channel.
    All,
    /// One channel.
    Channel(ChannelId),
}

impl std::fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionScope::All => write!(f, "*"),
            SubscriptionScope::Channel(channel) => write!(f, "{}", channel),
        }
    }
}

/// A registered callback with its id
pub(crate) type Entry = (SubscriptionId, Handler);

/// Callback sets keyed by scope
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    global: Vec<Entry>,
    channels: HashMap<ChannelId, Vec<Entry>>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, scope: SubscriptionScope, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::new();
        match scope {
            SubscriptionScope::All => self.global.push((id, handler)),
            SubscriptionScope::Channel(channel) => {
                self.channels.entry(channel).or_default().push((id, handler));
            }
        }
        id
    }

    /// Remove a subscription, dropping the channel entry once it is empty
    pub(crate) fn remove(&mut self, scope: SubscriptionScope, id: SubscriptionId) -> bool {
        match scope {
            SubscriptionScope::All => {
                let before = self.global.len();
                self.global.retain(|(sub, _)| *sub != id);
                self.global.len() != before
            }
            SubscriptionScope::Channel(channel) => {
                let Some(subs) = self.channels.get_mut(&channel) else {
                    return false;
                };
                let before = subs.len();
                subs.retain(|(sub, _)| *sub != id);
                let removed = subs.len() != before;
                if subs.is_empty() {
                    self.channels.remove(&channel);
                }
                removed
            }
        }
    }

    /// Clone out the global and channel handlers for one event
    pub(crate) fn handlers_for(&self, channel: ChannelId) -> (Vec<Entry>, Vec<Entry>) {
        let global = self.global.clone();
        let channel = self.channels.get(&channel).cloned().unwrap_or_default();
        (global, channel)
    }

    /// Whether a subscription is still registered
    pub(crate) fn contains(&self, scope: SubscriptionScope, id: SubscriptionId) -> bool {
        let subs = match scope {
            SubscriptionScope::All => Some(&self.global),
            SubscriptionScope::Channel(channel) => self.channels.get(&channel),
        };
        subs.is_some_and(|subs| subs.iter().any(|(sub, _)| *sub == id))
    }

    pub(crate) fn global_count(&self) -> usize {
        self.global.len()
    }

    pub(crate) fn channel_count(&self, channel: ChannelId) -> usize {
        self.channels.get(&channel).map_or(0, Vec::len)
    }

    pub(crate) fn active_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.channels.keys().copied().collect();
        channels.sort();
        channels
    }
}

/// Disposer returned by the subscribe operations.
///
/// Dropping it leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    scope: SubscriptionScope,
    registry: Weak<RwLock<SubscriptionRegistry>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        scope: SubscriptionScope,
        registry: &Arc<RwLock<SubscriptionRegistry>>,
    ) -> Self {
        Self {
            id,
            scope,
            registry: Arc::downgrade(registry),
        }
    }

    /// Subscription id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// What this subscription listens to
    pub fn scope(&self) -> SubscriptionScope {
        self.scope
    }

    /// Remove the callback; no further events reach it.
    ///
    /// This includes an event currently being fanned out: if an earlier
    /// subscriber of that event unsubscribes this one, it is skipped.
    /// Returns false if the bus is gone or the subscription was not found.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.write().remove(self.scope, self.id);
        if removed {
            tracing::debug!(scope = %self.scope, "Subscription {} removed", self.id);
        }
        removed
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("global", &self.global.len())
            .field("channels", &self.active_channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        handler(|_| Ok(Delivery::Done))
    }

    #[test]
    fn test_add_and_count() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(SubscriptionScope::All, noop());
        registry.add(SubscriptionScope::Channel(ChannelId::HttpRequest), noop());
        registry.add(SubscriptionScope::Channel(ChannelId::HttpRequest), noop());

        assert_eq!(registry.global_count(), 1);
        assert_eq!(registry.channel_count(ChannelId::HttpRequest), 2);
        assert_eq!(registry.channel_count(ChannelId::ShieldEvent), 0);

        let (global, channel) = registry.handlers_for(ChannelId::HttpRequest);
        assert_eq!(global.len(), 1);
        assert_eq!(channel.len(), 2);
    }

    #[test]
    fn test_contains_tracks_removal() {
        let mut registry = SubscriptionRegistry::new();
        let scope = SubscriptionScope::Channel(ChannelId::DreamstateEvent);
        let id = registry.add(scope, noop());

        assert!(registry.contains(scope, id));
        assert!(!registry.contains(SubscriptionScope::All, id));
        registry.remove(scope, id);
        assert!(!registry.contains(scope, id));
    }

    #[test]
    fn test_last_unsubscribe_removes_channel_entry() {
        let mut registry = SubscriptionRegistry::new();
        let scope = SubscriptionScope::Channel(ChannelId::SystemMetric);
        let a = registry.add(scope, noop());
        let b = registry.add(scope, noop());

        assert!(registry.remove(scope, a));
        assert_eq!(registry.active_channels(), vec![ChannelId::SystemMetric]);
        assert!(registry.remove(scope, b));
        assert!(registry.active_channels().is_empty());

        // Double unsubscribe should return false
        assert!(!registry.remove(scope, b));
    }

    #[test]
    fn test_subscription_handle() {
        let registry = Arc::new(RwLock::new(SubscriptionRegistry::new()));
        let id = registry.write().add(SubscriptionScope::All, noop());
        let sub = Subscription::new(id, SubscriptionScope::All, &registry);

        assert_eq!(sub.id(), id);
        assert_eq!(sub.scope(), SubscriptionScope::All);
        assert!(sub.unsubscribe());
        assert_eq!(registry.read().global_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let registry = Arc::new(RwLock::new(SubscriptionRegistry::new()));
        let id = registry.write().add(SubscriptionScope::All, noop());
        let sub = Subscription::new(id, SubscriptionScope::All, &registry);
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}
