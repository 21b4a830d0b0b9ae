//! Registry of search parameters shared by every resource type of a service.
//!
//! Uses DashMap so parameters can be registered while searches are running.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::SearchError;
use crate::parameters::{MatchKind, SearchParamDef, SearchParamType};
use crate::query::{Predicate, SearchQuery, SearchRequest};

#[derive(Debug, Default)]
pub struct PredicateRegistry {
    by_name: DashMap<String, Arc<SearchParamDef>>,
}

impl PredicateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in clinical parameters:
    /// `patient`, `subject`, `status`, `identifier`, `category` and `code`.
    pub fn with_defaults() -> Result<Self, SearchError> {
        let registry = Self::new();
        let defaults = [
            SearchParamDef::new(
                "patient",
                SearchParamType::Reference,
                "subject.reference",
                MatchKind::Prefixed("Patient/".to_string()),
            )?,
            SearchParamDef::new(
                "subject",
                SearchParamType::Reference,
                "subject.reference",
                MatchKind::Contains,
            )?,
            SearchParamDef::new("status", SearchParamType::Token, "status", MatchKind::Exact)?,
            SearchParamDef::new(
                "identifier",
                SearchParamType::Token,
                "identifier",
                MatchKind::ArrayField("value".to_string()),
            )?,
            SearchParamDef::new(
                "category",
                SearchParamType::Token,
                "category",
                MatchKind::ConceptCode,
            )?,
            SearchParamDef::new(
                "code",
                SearchParamType::Token,
                "code.coding",
                MatchKind::CodingCode,
            )?,
        ];
        for def in defaults {
            registry.register(def);
        }
        Ok(registry)
    }

    /// Adds or replaces a parameter.
    pub fn register(&self, def: SearchParamDef) {
        self.by_name.insert(def.name.clone(), Arc::new(def));
    }

    pub fn get(&self, name: &str) -> Option<Arc<SearchParamDef>> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    /// All parameters, sorted by name.
    pub fn all(&self) -> Vec<Arc<SearchParamDef>> {
        let mut params: Vec<_> = self.by_name.iter().map(|e| e.value().clone()).collect();
        params.sort_by(|a, b| a.name.cmp(&b.name));
        params
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Compiles a parsed request into a query. Unknown parameter names are ignored and
    /// reported in [`SearchQuery::ignored`].
    pub fn compile(&self, request: &SearchRequest) -> SearchQuery {
        let mut predicates = Vec::new();
        let mut ignored = Vec::new();
        for (name, value) in &request.filters {
            match self.get(name) {
                Some(def) => predicates.push(Predicate::new(def, value.clone())),
                None => ignored.push(name.clone()),
            }
        }
        if !ignored.is_empty() {
            debug!(ignored = ?ignored, "ignoring unknown search parameters");
        }
        SearchQuery {
            predicates,
            page: request.page,
            ignored,
        }
    }

    /// Convenience for callers holding raw parameters.
    pub fn compile_params(
        &self,
        params: &BTreeMap<String, String>,
        settings: &crate::query::SearchSettings,
    ) -> Result<SearchQuery, SearchError> {
        let request = SearchRequest::from_params(params, settings)?;
        Ok(self.compile(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchSettings;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_registered() {
        let registry = PredicateRegistry::with_defaults().unwrap();
        let names: Vec<_> = registry.all().iter().map(|d| d.name.clone()).collect();
        assert_eq!(
            names,
            vec!["category", "code", "identifier", "patient", "status", "subject"]
        );
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let registry = PredicateRegistry::with_defaults().unwrap();
        let query = registry
            .compile_params(
                &params(&[("status", "final"), ("colour", "blue")]),
                &SearchSettings::default(),
            )
            .unwrap();
        assert_eq!(query.predicates.len(), 1);
        assert_eq!(query.ignored, vec!["colour".to_string()]);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let registry = PredicateRegistry::with_defaults().unwrap();
        let query = registry
            .compile_params(
                &params(&[("status", "final"), ("patient", "p1")]),
                &SearchSettings::default(),
            )
            .unwrap();
        let both = json!({"status": "final", "subject": {"reference": "Patient/p1"}});
        let one = json!({"status": "final", "subject": {"reference": "Patient/p2"}});
        assert!(query.matches(&both));
        assert!(!query.matches(&one));
    }

    #[test]
    fn register_replaces_by_name() {
        let registry = PredicateRegistry::with_defaults().unwrap();
        registry.register(
            SearchParamDef::new(
                "status",
                SearchParamType::String,
                "status",
                MatchKind::Contains,
            )
            .unwrap(),
        );
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.get("status").unwrap().kind, MatchKind::Contains);
    }
}
