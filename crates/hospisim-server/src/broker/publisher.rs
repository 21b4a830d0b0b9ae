use async_trait::async_trait;
use deadpool_redis::{Pool, redis::AsyncCommands};
use hospisim_core::events::{EventEnvelope, Topic};
use hospisim_storage::{EventPublisher, PublishError};
use tracing::debug;

/// Publishes envelopes with Redis `PUBLISH`, using the topic as the channel name.
#[derive(Clone)]
pub struct RedisEventPublisher {
    pool: Pool,
}

impl RedisEventPublisher {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, topic: &Topic, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let message = serde_json::to_string(envelope)?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| PublishError::BrokerUnavailable(e.to_string()))?;

        let receivers: i64 = conn
            .publish(topic.as_str(), &message)
            .await
            .map_err(|e| PublishError::BrokerUnavailable(e.to_string()))?;

        debug!(topic = %topic, receivers, "Published event to Redis");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
