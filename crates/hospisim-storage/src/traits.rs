//! Backend trait implemented by the in-memory and PostgreSQL stores.

use async_trait::async_trait;
use hospisim_core::ResourceType;
use hospisim_search::SearchQuery;

use crate::error::StorageError;
use crate::types::{SearchPage, StoredResource};

/// Row-level persistence for one clinical service.
///
/// Backends do not interpret documents; version numbering, metadata and validation are
/// handled by [`crate::ResourceStore`]. There is no per-row locking: concurrent
/// `replace` calls for the same key resolve last-write-wins.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Inserts a new row.
    ///
    /// Fails with `AlreadyExists` if `(resource_type, id)` is taken.
    async fn insert(&self, row: StoredResource) -> Result<StoredResource, StorageError>;

    async fn get(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Option<StoredResource>, StorageError>;

    /// Replaces the current row wholesale, keeping its `created_at`.
    ///
    /// Fails with `NotFound` if the row does not exist.
    async fn replace(&self, row: StoredResource) -> Result<StoredResource, StorageError>;

    /// Removes a row. Returns `false` if there was nothing to remove.
    async fn remove(&self, resource_type: ResourceType, id: &str) -> Result<bool, StorageError>;

    /// Rows of `resource_type` satisfying every predicate, in insertion order, windowed
    /// by the query's page.
    async fn search(
        &self,
        resource_type: ResourceType,
        query: &SearchQuery,
    ) -> Result<SearchPage, StorageError>;

    /// Short backend name for health output and logs.
    fn backend_name(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
