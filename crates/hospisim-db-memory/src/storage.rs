use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use hospisim_core::ResourceType;
use hospisim_search::SearchQuery;
use hospisim_storage::{SearchPage, StorageBackend, StorageError, StoredResource};

type StorageKey = (ResourceType, String);

#[derive(Debug, Clone)]
struct Row {
    /// Insertion sequence; search results are ordered by it.
    seq: u64,
    stored: StoredResource,
}

/// DashMap-backed store. Updates keep the row's original insertion position.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    rows: DashMap<StorageKey, Row>,
    seq: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn insert(&self, row: StoredResource) -> Result<StoredResource, StorageError> {
        match self.rows.entry((row.resource_type, row.id.clone())) {
            Entry::Occupied(_) => Err(StorageError::already_exists(
                row.resource_type.as_str(),
                row.id,
            )),
            Entry::Vacant(slot) => {
                let seq = self.seq.fetch_add(1, Ordering::SeqCst);
                slot.insert(Row {
                    seq,
                    stored: row.clone(),
                });
                Ok(row)
            }
        }
    }

    async fn get(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Option<StoredResource>, StorageError> {
        Ok(self
            .rows
            .get(&(resource_type, id.to_string()))
            .map(|row| row.stored.clone()))
    }

    async fn replace(&self, row: StoredResource) -> Result<StoredResource, StorageError> {
        let key = (row.resource_type, row.id.clone());
        let mut existing = self
            .rows
            .get_mut(&key)
            .ok_or_else(|| StorageError::not_found(row.resource_type.as_str(), &row.id))?;
        let created_at = existing.stored.created_at;
        existing.stored = StoredResource { created_at, ..row };
        Ok(existing.stored.clone())
    }

    async fn remove(&self, resource_type: ResourceType, id: &str) -> Result<bool, StorageError> {
        Ok(self.rows.remove(&(resource_type, id.to_string())).is_some())
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        query: &SearchQuery,
    ) -> Result<SearchPage, StorageError> {
        let mut matches: Vec<(u64, StoredResource)> = self
            .rows
            .iter()
            .filter(|entry| entry.key().0 == resource_type)
            .filter(|entry| query.matches(&entry.value().stored.document))
            .map(|entry| (entry.value().seq, entry.value().stored.clone()))
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);

        let total = matches.len();
        let items = query
            .page
            .apply(matches.into_iter().map(|(_, stored)| stored));
        Ok(SearchPage { total, items })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
