//! Filtered, paged search over one resource type.

use hospisim_core::ResourceType;
use hospisim_search::{SearchQuery, SqlBind, SqlFilter};
use hospisim_storage::{SearchPage, StorageError};
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;

use super::{ROW_COLUMNS, ResourceRow, row_to_stored};
use crate::error::storage_error;

const DOCUMENT_COLUMN: &str = "document";

/// Builds the count and page statements. `$1` is the resource type; filter binds
/// follow; the page statement appends `LIMIT`/`OFFSET` binds last.
pub fn build_statements(table: &str, filter: &SqlFilter) -> (String, String) {
    let where_clause = format!("resource_type = $1{}", filter.and_clause());
    let limit_at = filter.binds.len() + 2;
    let count = format!("SELECT COUNT(*) FROM {table} WHERE {where_clause}");
    let page = format!(
        "SELECT {ROW_COLUMNS} FROM {table} WHERE {where_clause} ORDER BY seq LIMIT ${limit_at} OFFSET ${}",
        limit_at + 1
    );
    (count, page)
}

pub async fn search(
    pool: &PgPool,
    table: &str,
    resource_type: ResourceType,
    search: &SearchQuery,
) -> Result<SearchPage, StorageError> {
    let filter = SqlFilter::build(DOCUMENT_COLUMN, search, 2);
    let (count_sql, page_sql) = build_statements(table, &filter);

    let mut count = query_scalar::<_, i64>(&count_sql).bind(resource_type.as_str());
    for bind in &filter.binds {
        count = match bind {
            SqlBind::Text(text) => count.bind(text.clone()),
            SqlBind::Json(json) => count.bind(json.clone()),
        };
    }
    let total = count
        .fetch_one(pool)
        .await
        .map_err(|e| storage_error("search count", e))?;

    let mut page = query_as::<_, ResourceRow>(&page_sql).bind(resource_type.as_str());
    for bind in &filter.binds {
        page = match bind {
            SqlBind::Text(text) => page.bind(text.clone()),
            SqlBind::Json(json) => page.bind(json.clone()),
        };
    }
    let rows = page
        .bind(i64::try_from(search.page.limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(search.page.offset).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error("search", e))?;

    Ok(SearchPage {
        total: usize::try_from(total).unwrap_or_default(),
        items: rows
            .into_iter()
            .map(row_to_stored)
            .collect::<Result<_, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospisim_search::{PredicateRegistry, SearchSettings};
    use std::collections::BTreeMap;

    #[test]
    fn statements_number_placeholders_after_filters() {
        let registry = PredicateRegistry::with_defaults().unwrap();
        let params: BTreeMap<String, String> = [("status", "final"), ("code", "718-7")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let query = registry
            .compile_params(&params, &SearchSettings::default())
            .unwrap();
        let filter = SqlFilter::build(DOCUMENT_COLUMN, &query, 2);
        let (count, page) = build_statements("lis_resources", &filter);

        assert_eq!(
            count,
            "SELECT COUNT(*) FROM lis_resources WHERE resource_type = $1 \
             AND document #> '{code,coding}' @> $2 AND document #>> '{status}' = $3"
        );
        assert!(page.ends_with("ORDER BY seq LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn unfiltered_statements() {
        let (count, page) = build_statements("t", &SqlFilter::default());
        assert_eq!(count, "SELECT COUNT(*) FROM t WHERE resource_type = $1");
        assert!(page.ends_with("LIMIT $2 OFFSET $3"));
    }
}
