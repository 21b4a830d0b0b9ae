//! Table and index creation.

use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::info;

use crate::config::is_valid_table_name;
use crate::error::{PostgresError, Result};

/// Owns the (validated) table name and creates the table on demand.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    table: String,
}

impl SchemaManager {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(PostgresError::config(format!(
                "invalid table name '{table}'"
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table_sql(&self) -> Vec<String> {
        let t = &self.table;
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {t} (
                    seq BIGSERIAL PRIMARY KEY,
                    id TEXT NOT NULL,
                    resource_type TEXT NOT NULL,
                    version_id BIGINT NOT NULL,
                    document JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL,
                    UNIQUE (resource_type, id)
                )"
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {t}_document_gin ON {t} USING GIN (document jsonb_path_ops)"
            ),
        ]
    }

    /// Creates the table and its indexes if they do not exist.
    pub async fn ensure_table(&self, pool: &PgPool) -> Result<()> {
        for statement in self.create_table_sql() {
            query(&statement).execute(pool).await?;
        }
        info!(table = %self.table, "resource table ready");
        Ok(())
    }
}
