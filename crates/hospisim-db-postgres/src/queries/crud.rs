//! Insert, read, replace and delete.

use hospisim_core::ResourceType;
use hospisim_storage::{StorageError, StoredResource};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use super::{ROW_COLUMNS, ResourceRow, row_to_stored, time_to_chrono};
use crate::error::storage_error;

/// Inserts a new row; a taken `(resource_type, id)` yields `AlreadyExists`.
pub async fn insert(
    pool: &PgPool,
    table: &str,
    row: StoredResource,
) -> Result<StoredResource, StorageError> {
    let sql = format!(
        "INSERT INTO {table} (id, resource_type, version_id, document, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (resource_type, id) DO NOTHING \
         RETURNING {ROW_COLUMNS}"
    );
    let inserted: Option<ResourceRow> = query_as(&sql)
        .bind(&row.id)
        .bind(row.resource_type.as_str())
        .bind(version_param(row.version)?)
        .bind(&row.document)
        .bind(time_to_chrono(row.created_at))
        .bind(time_to_chrono(row.updated_at))
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error("insert", e))?;

    match inserted {
        Some(stored) => row_to_stored(stored),
        None => Err(StorageError::already_exists(
            row.resource_type.as_str(),
            row.id,
        )),
    }
}

pub async fn get(
    pool: &PgPool,
    table: &str,
    resource_type: ResourceType,
    id: &str,
) -> Result<Option<StoredResource>, StorageError> {
    let sql = format!("SELECT {ROW_COLUMNS} FROM {table} WHERE resource_type = $1 AND id = $2");
    let row: Option<ResourceRow> = query_as(&sql)
        .bind(resource_type.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error("read", e))?;
    row.map(row_to_stored).transpose()
}

/// Overwrites version, document and `updated_at`. No version guard: last write wins.
pub async fn replace(
    pool: &PgPool,
    table: &str,
    row: StoredResource,
) -> Result<StoredResource, StorageError> {
    let sql = format!(
        "UPDATE {table} SET version_id = $3, document = $4, updated_at = $5 \
         WHERE resource_type = $1 AND id = $2 \
         RETURNING {ROW_COLUMNS}"
    );
    let updated: Option<ResourceRow> = query_as(&sql)
        .bind(row.resource_type.as_str())
        .bind(&row.id)
        .bind(version_param(row.version)?)
        .bind(&row.document)
        .bind(time_to_chrono(row.updated_at))
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error("update", e))?;

    match updated {
        Some(stored) => row_to_stored(stored),
        None => Err(StorageError::not_found(row.resource_type.as_str(), row.id)),
    }
}

pub async fn remove(
    pool: &PgPool,
    table: &str,
    resource_type: ResourceType,
    id: &str,
) -> Result<bool, StorageError> {
    let sql = format!("DELETE FROM {table} WHERE resource_type = $1 AND id = $2");
    let result = query(&sql)
        .bind(resource_type.as_str())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| storage_error("delete", e))?;
    Ok(result.rows_affected() > 0)
}

fn version_param(version: u64) -> Result<i64, StorageError> {
    i64::try_from(version)
        .map_err(|_| StorageError::internal(format!("version {version} out of range")))
}
