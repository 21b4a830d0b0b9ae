//! A clinical service: one [`ResourceStore`] behind the uniform REST surface.

pub mod capability;
pub mod handlers;
pub mod seed;

use std::sync::Arc;

use anyhow::Context;
use hospisim_db_memory::InMemoryStorage;
use hospisim_db_postgres::PostgresStorage;
use hospisim_storage::{EventPublisher, NoopPublisher, ResourceStore, StorageBackend};
use tracing::{info, warn};

use crate::broker::{RedisEventPublisher, create_redis_pool};
use crate::config::{AppConfig, StorageBackendKind};

pub use seed::{SeedError, SeedReport};

#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<ResourceStore>,
}

impl ServiceState {
    pub fn new(store: Arc<ResourceStore>) -> Self {
        Self { store }
    }
}

/// Builds the service's store from configuration and imports its seed file.
///
/// Redis, when enabled, is the event broker; otherwise events are not published.
pub async fn init_service(cfg: &AppConfig) -> anyhow::Result<ServiceState> {
    let publisher: Arc<dyn EventPublisher> = if cfg.redis.enabled {
        let pool = create_redis_pool(&cfg.redis)?;
        Arc::new(RedisEventPublisher::new(pool))
    } else {
        info!("Redis disabled, lifecycle events will not be published");
        Arc::new(NoopPublisher)
    };
    let store = build_store(cfg, publisher).await?;

    if let Some(path) = &cfg.service.seed_path {
        match seed::load_seed_file(&store, path).await {
            Ok(report) => info!(
                path = %path.display(),
                loaded = report.loaded,
                skipped = report.skipped,
                failed = report.failed,
                "Seed data imported"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "Seed data not loaded"),
        }
    }

    Ok(ServiceState::new(Arc::new(store)))
}

/// Builds the store with the configured backend, resource types and search limits.
pub async fn build_store(
    cfg: &AppConfig,
    publisher: Arc<dyn EventPublisher>,
) -> anyhow::Result<ResourceStore> {
    let service = cfg.service_kind().map_err(anyhow::Error::msg)?;
    let resource_types = cfg.resource_types().map_err(anyhow::Error::msg)?;

    let backend: Arc<dyn StorageBackend> = match cfg.storage.backend {
        StorageBackendKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageBackendKind::Postgres => {
            let pg = cfg
                .postgres_config()
                .context("storage.backend = \"postgres\" requires [storage.postgres]")?;
            Arc::new(
                PostgresStorage::new(pg)
                    .await
                    .context("PostgreSQL storage initialization failed")?,
            )
        }
    };

    info!(
        service = %service,
        backend = backend.backend_name(),
        publisher = publisher.name(),
        resource_types = resource_types.len(),
        "Resource store ready"
    );

    Ok(ResourceStore::new(service, backend, publisher)?
        .with_resource_types(resource_types)
        .with_search_settings(cfg.search_settings()))
}
