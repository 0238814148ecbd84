//! Channel relay transport.
//!
//! Hands events to another task over a bounded tokio channel, for example a
//! forwarder to an external log sink. The channel capacity is the only
//! buffer: when it is full or the receiver is gone the event is refused and
//! the bus logs the failure, so a slow consumer never stalls the drain loop.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::event_bus::{Delivery, NerveEvent, Transport};

/// Transport forwarding events into an mpsc channel
#[derive(Debug, Clone)]
pub struct RelayTransport {
    name: String,
    sender: mpsc::Sender<Arc<NerveEvent>>,
}

impl RelayTransport {
    /// Wrap an existing sender
    pub fn new(name: impl Into<String>, sender: mpsc::Sender<Arc<NerveEvent>>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Create a relay and the receiving end of its channel
    pub fn channel(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<NerveEvent>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(name, sender), receiver)
    }
}

impl Transport for RelayTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &Arc<NerveEvent>) -> anyhow::Result<Delivery> {
        match self.sender.try_send(Arc::clone(event)) {
            Ok(()) => Ok(Delivery::Done),
            Err(TrySendError::Full(_)) => Err(anyhow::anyhow!(
                "relay channel full ({} slots), event not forwarded",
                self.sender.max_capacity()
            )),
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("relay receiver closed")),
        }
    }
}
