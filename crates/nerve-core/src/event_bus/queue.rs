//! Admission and priority queue.
//!
//! Pending events are kept sorted by descending priority. Within one
//! priority tier events keep publish order. When the queue is at capacity
//! the configured [`DropPolicy`] decides whether the new event is refused or
//! a resident is evicted to make room.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::DropPolicy;

use super::envelope::NerveEvent;

/// Result of offering an event to the queue
#[derive(Debug)]
pub(crate) enum Admission {
    /// The event was inserted.
    Enqueued {
        /// A resident removed to make room, if the queue was full.
        evicted: Option<Arc<NerveEvent>>,
        /// The queue went from empty to holding one event.
        became_non_empty: bool,
    },
    /// The queue was full and the block policy refused the event.
    Rejected(Arc<NerveEvent>),
}

/// Bounded, priority-sorted store of pending events
#[derive(Debug)]
pub(crate) struct EventQueue {
    events: VecDeque<Arc<NerveEvent>>,
    capacity: usize,
    policy: DropPolicy,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize, policy: DropPolicy) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            policy,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Admit an event, applying the drop policy when full
    pub(crate) fn offer(&mut self, event: Arc<NerveEvent>) -> Admission {
        let mut evicted = None;

        if self.events.len() >= self.capacity {
            evicted = match self.policy {
                DropPolicy::Block => return Admission::Rejected(event),
                DropPolicy::DropOldest => self.events.pop_front(),
                DropPolicy::DropLowestPriority => self.remove_lowest_priority(),
            };
        }

        self.insert(event);

        Admission::Enqueued {
            evicted,
            became_non_empty: self.events.len() == 1,
        }
    }

    /// Remove up to `max` events from the head
    pub(crate) fn take_batch(&mut self, max: usize) -> Vec<Arc<NerveEvent>> {
        let n = max.min(self.events.len());
        self.events.drain(..n).collect()
    }

    /// Place the event before the first resident of strictly lower priority
    fn insert(&mut self, event: Arc<NerveEvent>) {
        let priority = event.priority();
        let index = self.events.partition_point(|e| e.priority() >= priority);
        self.events.insert(index, event);
    }

    /// Remove the earliest event of the lowest priority present.
    ///
    /// The queue is sorted, so the lowest tier sits at the tail and its
    /// earliest member is the first event of that tier.
    fn remove_lowest_priority(&mut self) -> Option<Arc<NerveEvent>> {
        let lowest = self.events.back()?.priority();
        let index = self.events.partition_point(|e| e.priority() > lowest);
        self.events.remove(index)
    }

    #[cfg(test)]
    fn priorities(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.priority().level()).collect()
    }
}
