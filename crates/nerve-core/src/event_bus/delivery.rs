//! Isolated delivery to a single target.
//!
//! Every subscriber and transport invocation goes through [`deliver`]. A
//! synchronous error or panic is logged and swallowed. A pending future is
//! spawned on the bus runtime and only observed for failure; the bus never
//! waits for it.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::envelope::{EventId, NerveEvent};
use super::events::ChannelId;

/// What a subscriber or transport hands back after receiving an event
pub enum Delivery {
    /// Handling finished synchronously.
    Done,
    /// Handling continues in the background.
    Pending(BoxFuture<'static, anyhow::Result<()>>),
}

impl Delivery {
    /// Wrap a future as background work
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Delivery::Pending(future.boxed())
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Done => write!(f, "Done"),
            Delivery::Pending(_) => write!(f, "Pending"),
        }
    }
}

/// Who an event is being delivered to, for log context
#[derive(Debug, Clone)]
pub(crate) enum DeliveryTarget {
    Global,
    Channel(ChannelId),
    Transport(Arc<str>),
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryTarget::Global => write!(f, "global subscriber"),
            DeliveryTarget::Channel(channel) => write!(f, "channel subscriber ({})", channel),
            DeliveryTarget::Transport(name) => write!(f, "transport ({})", name),
        }
    }
}

/// Invoke one target in isolation
pub(crate) fn deliver<F>(runtime: &Handle, target: DeliveryTarget, event: &NerveEvent, invoke: F)
where
    F: FnOnce() -> anyhow::Result<Delivery>,
{
    let event_id = event.id();

    match panic::catch_unwind(AssertUnwindSafe(invoke)) {
        Ok(Ok(Delivery::Done)) => {}
        Ok(Ok(Delivery::Pending(future))) => observe(runtime, target, event_id, future),
        Ok(Err(err)) => {
            tracing::error!(%event_id, "{} error: {:#}", target, err);
        }
        Err(panic_err) => {
            tracing::error!(
                %event_id,
                "{} panicked: {}",
                target,
                panic_message(&*panic_err)
            );
        }
    }
}

/// Spawn background work and log its eventual failure
fn observe(
    runtime: &Handle,
    target: DeliveryTarget,
    event_id: EventId,
    future: BoxFuture<'static, anyhow::Result<()>>,
) {
    runtime.spawn(async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(%event_id, "{} async error: {:#}", target, err);
            }
            Err(panic_err) => {
                tracing::error!(
                    %event_id,
                    "{} panicked asynchronously: {}",
                    target,
                    panic_message(&*panic_err)
                );
            }
        }
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
