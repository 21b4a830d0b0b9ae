//! Row and result types shared by the store and its backends.

use hospisim_core::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A persisted row: exactly one current document per `(resource_type, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    pub id: String,
    pub resource_type: ResourceType,
    /// Monotonic version counter, starting at 1.
    pub version: u64,
    /// The full document including `id`, `resourceType` and `meta`.
    pub document: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StoredResource {
    /// A first-version row created now.
    #[must_use]
    pub fn new(
        resource_type: ResourceType,
        id: impl Into<String>,
        version: u64,
        document: Value,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type,
            version,
            document,
            created_at: at,
            updated_at: at,
        }
    }

    #[must_use]
    pub fn version_id(&self) -> String {
        self.version.to_string()
    }
}

/// One page of backend search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Number of rows matching the predicates, independent of the page window.
    pub total: usize,
    pub items: Vec<StoredResource>,
}

/// Search response body: `{total, items}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total: usize,
    pub items: Vec<Value>,
}

impl From<SearchPage> for SearchResult {
    fn from(page: SearchPage) -> Self {
        Self {
            total: page.total,
            items: page.items.into_iter().map(|row| row.document).collect(),
        }
    }
}
