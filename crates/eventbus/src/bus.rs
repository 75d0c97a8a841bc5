//! The bus itself: lazily-created, per-topic broadcast channels.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::warn;

use crate::event::Event;
use crate::topic::Topic;

/// Per-topic channel capacity.
///
/// The source left the exact backpressure threshold unspecified (§9 open
/// questions); 1024 gives a slow subscriber several seconds of headroom at
/// typical node-event rates before it starts dropping the oldest queued
/// events, which is `tokio::sync::broadcast`'s built-in policy for a
/// receiver that falls behind.
pub const TOPIC_CAPACITY: usize = 1024;

/// In-process, topic-routed pub/sub.
///
/// Delivery is at-most-once: a subscriber that isn't listening yet, or
/// that falls behind by more than [`TOPIC_CAPACITY`] events, misses them.
/// Within one topic, publication order is preserved; there is no
/// ordering guarantee across topics — correlate via `executionId` instead.
#[derive(Default)]
pub struct EventBus {
    topics: DashMap<String, broadcast::Sender<Event>>,
}

impl EventBus {
    /// Build an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating its channel if this is the first
    /// subscriber.
    pub fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Event> {
        self.sender_for(topic).subscribe()
    }

    /// Publish an event to a topic. A topic with no subscribers silently
    /// drops the event — the bus never buffers for a topic nobody is
    /// watching.
    pub fn publish(&self, topic: &Topic, event: Event) {
        let sender = self.sender_for(topic);
        if let Err(broadcast::error::SendError(_)) = sender.send(event) {
            // No active subscribers; at-most-once delivery means this is
            // expected, not an error.
        }
    }

    fn sender_for(&self, topic: &Topic) -> broadcast::Sender<Event> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| {
                let (tx, _rx) = broadcast::channel(TOPIC_CAPACITY);
                tx
            })
            .clone()
    }

    /// Number of live topics, for diagnostics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// Log a warning when a subscriber's receive loop detects it lagged and
/// dropped events, so operators can see backpressure happening instead of
/// silently missing data.
pub fn warn_on_lag(topic: &Topic, skipped: u64) {
    warn!(topic = %topic, skipped, "event subscriber lagged, dropped oldest events");
}
