use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::{BrokerError, BrokerState, BrokerStatus, InboundMessage};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pattern subscription feeding the integration engine.
///
/// Messages published while disconnected are lost; delivery is at most once.
pub struct RedisSubscriber {
    redis_url: String,
    pattern: String,
    status: BrokerStatus,
}

impl RedisSubscriber {
    pub fn new(redis_url: impl Into<String>, pattern: impl Into<String>, status: BrokerStatus) -> Self {
        Self {
            redis_url: redis_url.into(),
            pattern: pattern.into(),
            status,
        }
    }

    /// Runs until the receiving side of `tx` is dropped, reconnecting after failures.
    pub async fn run(self, tx: mpsc::Sender<InboundMessage>) {
        info!(pattern = %self.pattern, "Starting Redis event subscription");

        loop {
            self.status.set(BrokerState::Connecting);
            match self.subscribe_loop(&tx).await {
                Ok(()) => {
                    info!("Event consumer closed, stopping Redis subscription");
                    break;
                }
                Err(e) => {
                    self.status.set(BrokerState::Disconnected);
                    error!(error = %e, "Redis subscription error, reconnecting in 5s");
                    sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn subscribe_loop(&self, tx: &mpsc::Sender<InboundMessage>) -> Result<(), BrokerError> {
        // Pooled connections cannot enter subscriber mode.
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        pubsub
            .psubscribe(self.pattern.as_str())
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;

        self.status.set(BrokerState::Connected);
        info!(pattern = %self.pattern, "Subscribed to Redis event channels");

        let mut stream = pubsub.on_message();
        loop {
            let Some(msg) = stream.next().await else {
                warn!("Redis pub/sub stream ended");
                return Err(BrokerError::StreamEnded);
            };

            let routing_key = msg.get_channel_name().to_string();
            let payload: String = msg
                .get_payload()
                .map_err(|e: redis::RedisError| BrokerError::Message(e.to_string()))?;
            debug!(topic = %routing_key, "Received event from Redis");

            if tx
                .send(InboundMessage {
                    routing_key,
                    payload,
                })
                .await
                .is_err()
            {
                return Ok(());
            }
        }
    }
}
