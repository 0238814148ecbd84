//! Transport interface and registry.
//!
//! A transport is a named sink that receives every delivered event,
//! whatever its channel. It is the only way events leave the process and it
//! follows the same fire-and-forget contract as in-process subscribers.

use std::sync::Arc;

use super::delivery::Delivery;
use super::envelope::NerveEvent;

/// External sink for delivered events
pub trait Transport: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Hand an event to the sink.
    ///
    /// Return `Delivery::Pending` for work that completes later; the bus
    /// spawns it and only logs its failure.
    fn send(&self, event: &Arc<NerveEvent>) -> anyhow::Result<Delivery>;
}

/// Registered transports in registration order
#[derive(Default)]
pub(crate) struct TransportRegistry {
    transports: Vec<(Arc<str>, Arc<dyn Transport>)>,
}

impl TransportRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, transport: Arc<dyn Transport>) {
        let name: Arc<str> = Arc::from(transport.name());
        self.transports.push((name, transport));
    }

    /// Clone out the transports for one event
    pub(crate) fn snapshot(&self) -> Vec<(Arc<str>, Arc<dyn Transport>)> {
        self.transports.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.transports.len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.transports.iter().map(|(n, _)| n.to_string()).collect()
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Transport for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn send(&self, _event: &Arc<NerveEvent>) -> anyhow::Result<Delivery> {
            Ok(Delivery::Done)
        }
    }

    #[test]
    fn test_registration_order() {
        let mut registry = TransportRegistry::new();
        registry.register(Arc::new(Named("log")));
        registry.register(Arc::new(Named("relay")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["log", "relay"]);
        let names: Vec<String> = registry
            .snapshot()
            .iter()
            .map(|(n, t)| format!("{}={}", n, t.name()))
            .collect();
        assert_eq!(names, vec!["log=log", "relay=relay"]);
    }
}
