//! In-process event bus.
//!
//! Wraps a tokio broadcast channel so a clinical service and an integration engine can
//! run in one process without a broker.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::envelope::EventEnvelope;
use super::topic::Topic;

/// Events beyond this limit are dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// An envelope together with the topic it was published on.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub topic: Topic,
    pub envelope: EventEnvelope,
}

#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<PublishedEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of subscribers that received the event (0 if none).
    pub fn send(&self, topic: Topic, envelope: EventEnvelope) -> usize {
        self.sender
            .send(PublishedEvent { topic, envelope })
            .unwrap_or_default()
    }

    /// Events sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
