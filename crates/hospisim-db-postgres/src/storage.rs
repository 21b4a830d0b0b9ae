//! PostgreSQL implementation of the StorageBackend trait.

use async_trait::async_trait;
use hospisim_core::ResourceType;
use hospisim_search::SearchQuery;
use hospisim_storage::{SearchPage, StorageBackend, StorageError, StoredResource};
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;

use crate::config::PostgresConfig;
use crate::error::storage_error;
use crate::pool;
use crate::queries::{crud, search};
use crate::schema::SchemaManager;

/// PostgreSQL storage backend holding one service's current documents.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    schema: SchemaManager,
}

impl PostgresStorage {
    /// Connects, then creates the configured table if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid, the pool cannot be created,
    /// or the table cannot be created.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let schema = SchemaManager::new(config.table.clone())?;
        let pool = pool::create_pool(&config).await?;
        schema.ensure_table(&pool).await?;
        Ok(Self { pool, schema })
    }

    /// Wraps an existing pool. The table is not created.
    pub fn from_pool(pool: PgPool, schema: SchemaManager) -> Self {
        Self { pool, schema }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }
}

#[async_trait]
impl StorageBackend for PostgresStorage {
    async fn insert(&self, row: StoredResource) -> Result<StoredResource, StorageError> {
        crud::insert(&self.pool, self.table(), row).await
    }

    async fn get(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Option<StoredResource>, StorageError> {
        crud::get(&self.pool, self.table(), resource_type, id).await
    }

    async fn replace(&self, row: StoredResource) -> Result<StoredResource, StorageError> {
        crud::replace(&self.pool, self.table(), row).await
    }

    async fn remove(&self, resource_type: ResourceType, id: &str) -> Result<bool, StorageError> {
        crud::remove(&self.pool, self.table(), resource_type, id).await
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        query: &SearchQuery,
    ) -> Result<SearchPage, StorageError> {
        search::search(&self.pool, self.table(), resource_type, query).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("health check", e))?;
        Ok(())
    }
}
