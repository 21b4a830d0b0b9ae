//! Storage abstraction and the generic versioned resource store.
//!
//! [`StorageBackend`] persists rows; [`ResourceStore`] owns everything a clinical
//! service means by create/read/update/delete/search: the supported-type check, id
//! assignment, version counters, metadata stamping, document validation and lifecycle
//! event publication through an [`EventPublisher`].

pub mod error;
pub mod publish;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, StorageError};
pub use publish::{
    BroadcastPublisher, EventPublisher, NoopPublisher, PublishError, PublishStats,
    PublishStatsSnapshot,
};
pub use store::ResourceStore;
pub use traits::StorageBackend;
pub use types::{SearchPage, SearchResult, StoredResource};
