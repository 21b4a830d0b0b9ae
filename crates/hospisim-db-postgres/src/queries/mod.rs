//! SQL query implementations.

pub mod crud;
pub mod search;

use chrono::{DateTime, Utc};
use hospisim_core::ResourceType;
use hospisim_storage::{StorageError, StoredResource};
use serde_json::Value;
use std::str::FromStr;
use time::OffsetDateTime;

/// Columns selected for every row read, in [`ResourceRow`] order.
pub(crate) const ROW_COLUMNS: &str =
    "id, resource_type, version_id, document, created_at, updated_at";

pub(crate) type ResourceRow = (String, String, i64, Value, DateTime<Utc>, DateTime<Utc>);

/// Converts chrono DateTime to time OffsetDateTime.
pub(crate) fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
}

/// Converts time OffsetDateTime to chrono DateTime.
pub(crate) fn time_to_chrono(dt: OffsetDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()).unwrap_or_default()
}

pub(crate) fn row_to_stored(row: ResourceRow) -> Result<StoredResource, StorageError> {
    let (id, resource_type, version_id, document, created_at, updated_at) = row;
    let resource_type = ResourceType::from_str(&resource_type)
        .map_err(|e| StorageError::internal(format!("corrupt row {id}: {e}")))?;
    Ok(StoredResource {
        id,
        resource_type,
        version: u64::try_from(version_id).unwrap_or_default(),
        document,
        created_at: chrono_to_time(created_at),
        updated_at: chrono_to_time(updated_at),
    })
}
