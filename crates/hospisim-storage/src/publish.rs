//! Lifecycle event publication.
//!
//! Delivery is at-most-once: the store calls the publisher once after a successful
//! write and never retries. Failures are returned to the store, which logs and counts
//! them without failing the write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hospisim_core::events::{EventBroadcaster, EventEnvelope, Topic};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// No broker is configured; the event was intentionally not sent.
    #[error("event publishing is disabled")]
    Disabled,

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &Topic, envelope: &EventEnvelope) -> Result<(), PublishError>;

    /// Short name for health output and logs.
    fn name(&self) -> &'static str;
}

/// Publisher used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, _topic: &Topic, _envelope: &EventEnvelope) -> Result<(), PublishError> {
        Err(PublishError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Publishes onto an in-process [`EventBroadcaster`].
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    broadcaster: Arc<EventBroadcaster>,
}

impl BroadcastPublisher {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { broadcaster }
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, topic: &Topic, envelope: &EventEnvelope) -> Result<(), PublishError> {
        // Zero receivers is not an error: the event is simply lost.
        self.broadcaster.send(topic.clone(), envelope.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

/// Outcome counters for every publish attempt made by a store.
#[derive(Debug, Default)]
pub struct PublishStats {
    published: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishStatsSnapshot {
    pub published: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl PublishStats {
    pub fn record(&self, outcome: &Result<(), PublishError>) {
        let counter = match outcome {
            Ok(()) => &self.published,
            Err(PublishError::Disabled) => &self.skipped,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublishStatsSnapshot {
        PublishStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospisim_core::ResourceType;
    use hospisim_core::events::EventAction;
    use serde_json::json;

    fn event() -> (Topic, EventEnvelope) {
        (
            Topic::for_resource("lis", ResourceType::Specimen, EventAction::Created),
            EventEnvelope::new("lis", ResourceType::Specimen, EventAction::Created, json!({})),
        )
    }

    #[tokio::test]
    async fn noop_reports_disabled() {
        let (topic, envelope) = event();
        let outcome = NoopPublisher.publish(&topic, &envelope).await;
        assert!(matches!(outcome, Err(PublishError::Disabled)));
    }

    #[tokio::test]
    async fn broadcast_delivers_topic_and_envelope() {
        let broadcaster = EventBroadcaster::new_shared();
        let mut rx = broadcaster.subscribe();
        let publisher = BroadcastPublisher::new(broadcaster);

        let (topic, envelope) = event();
        publisher.publish(&topic, &envelope).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.topic.as_str(), "lis.specimen.created");
        assert_eq!(received.envelope, envelope);
    }

    #[test]
    fn stats_classify_outcomes() {
        let stats = PublishStats::default();
        stats.record(&Ok(()));
        stats.record(&Ok(()));
        stats.record(&Err(PublishError::Disabled));
        stats.record(&Err(PublishError::BrokerUnavailable("down".into())));
        assert_eq!(
            stats.snapshot(),
            PublishStatsSnapshot {
                published: 2,
                failed: 1,
                skipped: 1
            }
        );
    }
}
