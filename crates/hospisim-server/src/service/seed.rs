//! Startup import of Bundle-shaped seed files.
//!
//! Seeding goes through [`ResourceStore::import`], so documents are validated and
//! stamped like any other create but no events are published.

use std::path::{Path, PathBuf};

use hospisim_storage::{ResourceStore, StorageError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seed file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("seed file must be a Bundle with an 'entry' array")]
    NotABundle,
}

/// Per-entry outcome counts of one seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub loaded: usize,
    /// Types this service does not host, and ids that already exist.
    pub skipped: usize,
    pub failed: usize,
}

pub async fn load_seed_file(store: &ResourceStore, path: &Path) -> Result<SeedReport, SeedError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle: Value = serde_json::from_slice(&bytes)?;
    load_bundle(store, bundle).await
}

pub async fn load_bundle(store: &ResourceStore, bundle: Value) -> Result<SeedReport, SeedError> {
    let Value::Object(mut bundle) = bundle else {
        return Err(SeedError::NotABundle);
    };
    let Some(Value::Array(entries)) = bundle.remove("entry") else {
        return Err(SeedError::NotABundle);
    };

    let mut report = SeedReport::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let Some(resource) = entry.get("resource").filter(|r| r.is_object()).cloned() else {
            warn!(index, "seed entry has no resource object");
            report.failed += 1;
            continue;
        };
        let Some(type_name) = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            warn!(index, "seed entry has no resourceType");
            report.failed += 1;
            continue;
        };

        match store.import(&type_name, resource).await {
            Ok(_) => report.loaded += 1,
            Err(StorageError::UnsupportedType { .. }) => {
                debug!(index, resource_type = %type_name, "seed entry type not hosted, skipped");
                report.skipped += 1;
            }
            Err(StorageError::AlreadyExists { id, .. }) => {
                debug!(index, resource_type = %type_name, resource_id = %id, "seed entry already present");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(index, resource_type = %type_name, error = %e, "seed entry rejected");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
