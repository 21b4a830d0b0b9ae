//! In-memory [`StorageBackend`](hospisim_storage::StorageBackend) for development,
//! tests and single-process demos. Contents are lost on restart.

mod storage;

pub use storage::InMemoryStorage;
