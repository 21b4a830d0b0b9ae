//! The integration engine: consumes lifecycle events from the broker and routes each
//! one to the destination systems named by the matching routing rules.

pub mod engine;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod log;
pub mod mirror;
pub mod registry;
pub mod rules;
pub mod stats;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::broker::{BrokerState, BrokerStatus, InboundMessage, RedisSubscriber, create_redis_pool};
use crate::config::AppConfig;

pub use engine::{IntegrationEngine, run_consumer};
pub use error::RouterError;
pub use log::{MessageLog, MessageStatus, RouterLogEntry};
pub use registry::{ServiceHealth, ServiceRegistry};
pub use rules::{RoutingRule, RoutingTable};

/// Capacity of the channel between the broker subscriber and the consumer.
pub const INBOUND_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct IntegrationState {
    pub engine: Arc<IntegrationEngine>,
    pub broker: BrokerStatus,
    /// Queue of the consumer task. Without one, `POST /route` processes inline.
    pub inbound: Option<mpsc::Sender<InboundMessage>>,
}

impl IntegrationState {
    pub fn new(engine: Arc<IntegrationEngine>, broker: BrokerStatus) -> Self {
        Self {
            engine,
            broker,
            inbound: None,
        }
    }

    pub fn with_inbound(mut self, inbound: mpsc::Sender<InboundMessage>) -> Self {
        self.inbound = Some(inbound);
        self
    }
}

/// Builds the engine from configuration and starts the consumer task. When Redis is
/// enabled the broker subscriber feeds the same queue as `POST /route`.
pub async fn init_integration(cfg: &AppConfig) -> anyhow::Result<IntegrationState> {
    let router = &cfg.router;
    let rules = RoutingTable::from_config(&router.rules).context("invalid routing rules")?;
    let registry = ServiceRegistry::from_config(&router.services, router.health_timeout())
        .context("invalid service registry")?;
    let mut engine = IntegrationEngine::new(rules, registry, router.log_capacity);

    if !cfg.redis.enabled {
        info!("Redis disabled, integration engine will only route manual messages");
        let engine = Arc::new(engine);
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        tokio::spawn(run_consumer(engine.clone(), rx));
        return Ok(
            IntegrationState::new(engine, BrokerStatus::new(BrokerState::Disabled))
                .with_inbound(tx),
        );
    }

    let pool = create_redis_pool(&cfg.redis)?;
    engine = engine.with_mirror(Arc::new(mirror::RedisLogMirror::new(
        pool,
        router.log_capacity,
    )));
    match engine.restore_log().await {
        Ok(restored) => info!(restored, "Router log restored from mirror"),
        Err(e) => warn!(error = %e, "Router log not restored, starting empty"),
    }

    let engine = Arc::new(engine);
    let status = BrokerStatus::new(BrokerState::Connecting);
    let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
    let subscriber = RedisSubscriber::new(
        cfg.redis.url.clone(),
        router.subscribe_pattern.clone(),
        status.clone(),
    );
    tokio::spawn(subscriber.run(tx.clone()));
    tokio::spawn(run_consumer(engine.clone(), rx));

    info!(
        pattern = %router.subscribe_pattern,
        rules = engine.routing_table().len(),
        services = engine.registry().names().len(),
        "Integration engine started"
    );
    Ok(IntegrationState::new(engine, status).with_inbound(tx))
}
