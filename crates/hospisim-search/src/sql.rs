//! Renders compiled predicates as a PostgreSQL `WHERE` fragment over a JSONB column.

use serde_json::{Value, json};

use crate::parameters::MatchKind;
use crate::query::{Predicate, SearchQuery};

/// Value bound to a numbered placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlBind {
    Text(String),
    Json(Value),
}

/// Conjunction of conditions with their bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFilter {
    pub conditions: Vec<String>,
    pub binds: Vec<SqlBind>,
}

impl SqlFilter {
    /// Builds conditions against `column`, numbering placeholders from `first_placeholder`.
    pub fn build(column: &str, query: &SearchQuery, first_placeholder: usize) -> Self {
        let mut filter = Self::default();
        for predicate in &query.predicates {
            let placeholder = first_placeholder + filter.binds.len();
            let (condition, bind) = render(column, predicate, placeholder);
            filter.conditions.push(condition);
            filter.binds.push(bind);
        }
        filter
    }

    /// `AND`-joined conditions prefixed with ` AND `, or an empty string.
    pub fn and_clause(&self) -> String {
        self.conditions
            .iter()
            .map(|c| format!(" AND {c}"))
            .collect()
    }
}

fn render(column: &str, predicate: &Predicate, n: usize) -> (String, SqlBind) {
    let path = predicate.def.path.pg_path();
    let value = predicate.value.clone();
    match &predicate.def.kind {
        MatchKind::Exact => (
            format!("{column} #>> {path} = ${n}"),
            SqlBind::Text(value),
        ),
        MatchKind::Prefixed(prefix) => (
            format!("{column} #>> {path} = ${n}"),
            SqlBind::Text(format!("{prefix}{value}")),
        ),
        MatchKind::Contains => (
            format!("strpos({column} #>> {path}, ${n}) > 0"),
            SqlBind::Text(value),
        ),
        MatchKind::ArrayField(field) => {
            let mut element = serde_json::Map::new();
            element.insert(field.clone(), Value::String(value));
            (
                format!("{column} #> {path} @> ${n}"),
                SqlBind::Json(Value::Array(vec![Value::Object(element)])),
            )
        }
        MatchKind::CodingCode => (
            format!("{column} #> {path} @> ${n}"),
            SqlBind::Json(json!([{ "code": value }])),
        ),
        // A lone concept is wrapped so one containment check covers both shapes.
        MatchKind::ConceptCode => (
            format!(
                "(CASE jsonb_typeof({column} #> {path}) WHEN 'object' \
                 THEN jsonb_build_array({column} #> {path}) \
                 ELSE {column} #> {path} END) @> ${n}"
            ),
            SqlBind::Json(json!([{ "coding": [{ "code": value }] }])),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchSettings;
    use crate::registry::PredicateRegistry;
    use std::collections::BTreeMap;

    fn query(pairs: &[(&str, &str)]) -> SearchQuery {
        let params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PredicateRegistry::with_defaults()
            .unwrap()
            .compile_params(&params, &SearchSettings::default())
            .unwrap()
    }

    #[test]
    fn empty_query_renders_nothing() {
        let filter = SqlFilter::build("document", &query(&[]), 2);
        assert!(filter.conditions.is_empty());
        assert_eq!(filter.and_clause(), "");
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        // BTreeMap ordering: patient < status
        let filter = SqlFilter::build("document", &query(&[("status", "final"), ("patient", "p1")]), 2);
        assert_eq!(
            filter.conditions,
            vec![
                "document #>> '{subject,reference}' = $2".to_string(),
                "document #>> '{status}' = $3".to_string(),
            ]
        );
        assert_eq!(
            filter.binds,
            vec![
                SqlBind::Text("Patient/p1".to_string()),
                SqlBind::Text("final".to_string()),
            ]
        );
    }

    #[test]
    fn containment_binds_json() {
        let filter = SqlFilter::build("document", &query(&[("category", "laboratory")]), 1);
        assert_eq!(
            filter.conditions[0],
            "(CASE jsonb_typeof(document #> '{category}') WHEN 'object' \
             THEN jsonb_build_array(document #> '{category}') \
             ELSE document #> '{category}' END) @> $1"
        );
        assert_eq!(
            filter.binds[0],
            SqlBind::Json(json!([{"coding": [{"code": "laboratory"}]}]))
        );

        let filter = SqlFilter::build("document", &query(&[("identifier", "MRN-1")]), 1);
        assert_eq!(filter.binds[0], SqlBind::Json(json!([{"value": "MRN-1"}])));
    }

    #[test]
    fn subject_uses_strpos() {
        let filter = SqlFilter::build("document", &query(&[("subject", "p%1")]), 4);
        assert_eq!(
            filter.conditions[0],
            "strpos(document #>> '{subject,reference}', $4) > 0"
        );
    }
}
