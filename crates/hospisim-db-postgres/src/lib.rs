//! PostgreSQL storage backend for hospisim.
//!
//! Each clinical service owns one table of current documents keyed by
//! `(resource_type, id)`, with the document in a JSONB column. Rows carry a
//! `BIGSERIAL` insertion sequence that orders search results.
//!
//! - [`config`]: connection and table settings
//! - [`pool`]: connection pool creation
//! - [`schema`]: table and index creation
//! - [`queries`]: CRUD and search SQL
//! - [`storage`]: the [`StorageBackend`](hospisim_storage::StorageBackend) impl

pub mod config;
mod error;
mod pool;
pub mod queries;
mod schema;
mod storage;

pub use config::PostgresConfig;
pub use error::{PostgresError, Result};
pub use pool::create_pool;
pub use schema::SchemaManager;
pub use storage::PostgresStorage;
