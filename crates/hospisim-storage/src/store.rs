//! The generic versioned resource store shared by every clinical service.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use hospisim_core::events::{EventAction, EventEnvelope, Topic};
use hospisim_core::{
    Document, FhirDateTime, ResourceMeta, ResourceType, ServiceKind, generate_id, validate_id,
};
use hospisim_search::{PredicateRegistry, SearchSettings};
use metrics::counter;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::publish::{EventPublisher, PublishStats, PublishStatsSnapshot};
use crate::traits::StorageBackend;
use crate::types::{SearchResult, StoredResource};

pub const EVENTS_PUBLISHED: &str = "hospisim_events_published_total";
pub const EVENTS_PUBLISH_FAILED: &str = "hospisim_events_publish_failed_total";
pub const STORE_OPERATIONS: &str = "hospisim_store_operations_total";

/// Whether a write announces itself on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announce {
    Yes,
    No,
}

/// Per-service store: supported-type gate, id and version assignment, metadata
/// stamping, validation, persistence and event publication.
///
/// Writes and publishes are not atomic. A write that succeeds is never rolled back
/// because its event could not be published.
pub struct ResourceStore {
    service: ServiceKind,
    resource_types: Vec<ResourceType>,
    backend: Arc<dyn StorageBackend>,
    publisher: Arc<dyn EventPublisher>,
    registry: Arc<PredicateRegistry>,
    settings: SearchSettings,
    stats: PublishStats,
}

impl ResourceStore {
    /// Store hosting the service's default resource types with the built-in search
    /// parameters.
    pub fn new(
        service: ServiceKind,
        backend: Arc<dyn StorageBackend>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            service,
            resource_types: service.default_resource_types().to_vec(),
            backend,
            publisher,
            registry: Arc::new(PredicateRegistry::with_defaults()?),
            settings: SearchSettings::default(),
            stats: PublishStats::default(),
        })
    }

    pub fn with_resource_types(mut self, resource_types: Vec<ResourceType>) -> Self {
        self.resource_types = resource_types;
        self
    }

    pub fn with_registry(mut self, registry: Arc<PredicateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_search_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn resource_types(&self) -> &[ResourceType] {
        &self.resource_types
    }

    pub fn registry(&self) -> &Arc<PredicateRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn publisher_name(&self) -> &'static str {
        self.publisher.name()
    }

    pub fn publish_stats(&self) -> PublishStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolves a type name against the types this service hosts.
    pub fn resolve(&self, type_name: &str) -> Result<ResourceType, StorageError> {
        ResourceType::from_str(type_name)
            .ok()
            .filter(|rt| self.resource_types.contains(rt))
            .ok_or_else(|| StorageError::unsupported_type(type_name, self.service.as_str()))
    }

    /// Creates a resource and publishes `<service>.<type>.created`.
    ///
    /// A caller-supplied `id` is kept; otherwise a UUID is assigned.
    pub async fn create(&self, type_name: &str, body: Value) -> Result<Value, StorageError> {
        let resource_type = self.resolve(type_name)?;
        self.insert(resource_type, body, Announce::Yes).await
    }

    /// Creates a resource without publishing an event. Used for seed data.
    pub async fn import(&self, type_name: &str, body: Value) -> Result<Value, StorageError> {
        let resource_type = self.resolve(type_name)?;
        self.insert(resource_type, body, Announce::No).await
    }

    pub async fn read(&self, type_name: &str, id: &str) -> Result<Value, StorageError> {
        let resource_type = self.resolve(type_name)?;
        counter!(STORE_OPERATIONS, "op" => "read").increment(1);
        self.backend
            .get(resource_type, id)
            .await?
            .map(|row| row.document)
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))
    }

    /// Replaces a resource wholesale, bumps its version and publishes
    /// `<service>.<type>.updated`. Nothing is written or published if it is absent.
    pub async fn update(
        &self,
        type_name: &str,
        id: &str,
        body: Value,
    ) -> Result<Value, StorageError> {
        let resource_type = self.resolve(type_name)?;
        let existing = self
            .backend
            .get(resource_type, id)
            .await?
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?;

        let now = OffsetDateTime::now_utc();
        let version = existing.version + 1;
        let document = Self::stamp(resource_type, body, id, version, now)?;

        let stored = self
            .backend
            .replace(StoredResource {
                id: id.to_string(),
                resource_type,
                version,
                document,
                created_at: existing.created_at,
                updated_at: now,
            })
            .await?;
        counter!(STORE_OPERATIONS, "op" => "update").increment(1);
        debug!(
            resource_type = %resource_type,
            resource_id = %id,
            version,
            "resource updated"
        );

        self.announce(resource_type, EventAction::Updated, &stored.document)
            .await;
        Ok(stored.document)
    }

    /// Removes a resource. Deletes are not announced.
    pub async fn delete(&self, type_name: &str, id: &str) -> Result<(), StorageError> {
        let resource_type = self.resolve(type_name)?;
        if !self.backend.remove(resource_type, id).await? {
            return Err(StorageError::not_found(resource_type.as_str(), id));
        }
        counter!(STORE_OPERATIONS, "op" => "delete").increment(1);
        debug!(resource_type = %resource_type, resource_id = %id, "resource deleted");
        Ok(())
    }

    /// Conjunctive search over the registered parameters. `_count` and `_offset` select
    /// the page; unknown names are ignored.
    pub async fn search(
        &self,
        type_name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<SearchResult, StorageError> {
        let resource_type = self.resolve(type_name)?;
        let query = self.registry.compile_params(params, &self.settings)?;
        counter!(STORE_OPERATIONS, "op" => "search").increment(1);
        let page = self.backend.search(resource_type, &query).await?;
        Ok(page.into())
    }

    async fn insert(
        &self,
        resource_type: ResourceType,
        body: Value,
        announce: Announce,
    ) -> Result<Value, StorageError> {
        let id = match body.get("id") {
            None | Some(Value::Null) => generate_id(),
            Some(Value::String(id)) => {
                validate_id(id)
                    .map_err(|e| StorageError::invalid_resource(format!("id: {e}")))?;
                id.clone()
            }
            Some(_) => return Err(StorageError::invalid_resource("id must be a string")),
        };

        let now = OffsetDateTime::now_utc();
        let document = Self::stamp(resource_type, body, &id, 1, now)?;
        let stored = self
            .backend
            .insert(StoredResource::new(resource_type, id, 1, document, now))
            .await?;
        counter!(STORE_OPERATIONS, "op" => "create").increment(1);
        debug!(
            resource_type = %resource_type,
            resource_id = %stored.id,
            "resource created"
        );

        if announce == Announce::Yes {
            self.announce(resource_type, EventAction::Created, &stored.document)
                .await;
        }
        Ok(stored.document)
    }

    fn stamp(
        resource_type: ResourceType,
        body: Value,
        id: &str,
        version: u64,
        at: OffsetDateTime,
    ) -> Result<Value, StorageError> {
        let meta = ResourceMeta::new(version, FhirDateTime::new(at));
        let document = Document::from_client_json(resource_type, body, id, meta)?;
        Ok(document.to_value()?)
    }

    async fn announce(&self, resource_type: ResourceType, action: EventAction, document: &Value) {
        let service = self.service.as_str();
        let topic = Topic::for_resource(service, resource_type, action);
        let envelope = EventEnvelope::new(service, resource_type, action, document.clone());

        let outcome = self.publisher.publish(&topic, &envelope).await;
        self.stats.record(&outcome);
        match &outcome {
            Ok(()) => {
                counter!(EVENTS_PUBLISHED).increment(1);
                debug!(topic = %topic, event_id = %envelope.id, "event published");
            }
            Err(crate::publish::PublishError::Disabled) => {}
            Err(e) => {
                counter!(EVENTS_PUBLISH_FAILED).increment(1);
                warn!(topic = %topic, event_id = %envelope.id, error = %e, "event publish failed");
            }
        }
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("service", &self.service)
            .field("backend", &self.backend.backend_name())
            .field("publisher", &self.publisher.name())
            .finish()
    }
}
