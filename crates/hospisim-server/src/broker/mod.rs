//! Event transport between clinical services and the integration engine.
//!
//! Redis pub/sub is the broker: services `PUBLISH` each envelope on a channel named
//! after its topic, and the engine `PSUBSCRIBE`s. Without Redis, a service and an engine
//! in the same process share an [`EventBroadcaster`](hospisim_core::events::EventBroadcaster).
//! Either way the engine consumes [`InboundMessage`]s from one mpsc channel.

pub mod local;
pub mod publisher;
pub mod subscriber;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use deadpool_redis::{Pool, Runtime};
use thiserror::Error;

use crate::config::RedisConfig;

pub use local::forward_broadcast;
pub use publisher::RedisEventPublisher;
pub use subscriber::RedisSubscriber;

/// A raw event as it arrived: the topic it was published on and its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub routing_key: String,
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis subscribe error: {0}")]
    Subscribe(String),

    #[error("Redis message error: {0}")]
    Message(String),

    #[error("Redis pub/sub stream ended")]
    StreamEnded,
}

/// Creates the shared connection pool used for `PUBLISH` and the log mirror.
pub fn create_redis_pool(config: &RedisConfig) -> Result<Pool, BrokerError> {
    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    redis_config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| BrokerError::Pool(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrokerState {
    /// No broker configured and nothing wired in-process.
    Disabled = 0,
    InProcess = 1,
    Connecting = 2,
    Connected = 3,
    Disconnected = 4,
}

impl BrokerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerState::Disabled => "disabled",
            BrokerState::InProcess => "in-process",
            BrokerState::Connecting => "connecting",
            BrokerState::Connected => "connected",
            BrokerState::Disconnected => "disconnected",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => BrokerState::InProcess,
            2 => BrokerState::Connecting,
            3 => BrokerState::Connected,
            4 => BrokerState::Disconnected,
            _ => BrokerState::Disabled,
        }
    }
}

/// Connection state of the engine's event source, shared with `/health`.
#[derive(Debug, Clone)]
pub struct BrokerStatus(Arc<AtomicU8>);

impl BrokerStatus {
    pub fn new(state: BrokerState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn set(&self, state: BrokerState) {
        self.0.store(state as u8, Ordering::Relaxed);
    }

    pub fn get(&self) -> BrokerState {
        BrokerState::from_u8(self.0.load(Ordering::Relaxed))
    }
}

impl Default for BrokerStatus {
    fn default() -> Self {
        Self::new(BrokerState::Disabled)
    }
}
