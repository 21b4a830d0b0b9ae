use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SearchError;
use crate::parameters::SearchParamDef;

pub const COUNT_PARAM: &str = "_count";
pub const OFFSET_PARAM: &str = "_offset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub default_count: usize,
    pub max_count: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_count: 100,
            max_count: 1000,
        }
    }
}

/// Page window over the matching rows, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(SearchSettings::default().default_count, 0)
    }
}

/// Raw request split into filter parameters and the page window.
///
/// Names starting with `_` never filter; `_count` and `_offset` set the page and other
/// underscore names are dropped. Empty values are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub filters: BTreeMap<String, String>,
    pub page: Page,
}

impl SearchRequest {
    pub fn from_params(
        params: &BTreeMap<String, String>,
        settings: &SearchSettings,
    ) -> Result<Self, SearchError> {
        let mut filters = BTreeMap::new();
        let mut limit = settings.default_count;
        let mut offset = 0;

        for (name, value) in params {
            match name.as_str() {
                COUNT_PARAM => limit = parse_non_negative(name, value)?,
                OFFSET_PARAM => offset = parse_non_negative(name, value)?,
                control if control.starts_with('_') => {}
                _ if value.is_empty() => {}
                _ => {
                    filters.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(Self {
            filters,
            page: Page::new(limit.min(settings.max_count), offset),
        })
    }
}

fn parse_non_negative(name: &str, value: &str) -> Result<usize, SearchError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| SearchError::invalid_parameter(name, "expected a non-negative integer"))
}

/// One bound predicate: a registered parameter and the value it is compared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub def: Arc<SearchParamDef>,
    pub value: String,
}

impl Predicate {
    pub fn new(def: Arc<SearchParamDef>, value: String) -> Self {
        Self { def, value }
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.def.matches(document, &self.value)
    }
}

/// A compiled search: conjunction of predicates plus a page window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub predicates: Vec<Predicate>,
    pub page: Page,
    /// Parameter names that had no registered descriptor.
    pub ignored: Vec<String>,
}

impl SearchQuery {
    /// Matches everything.
    pub fn all(page: Page) -> Self {
        Self {
            predicates: Vec::new(),
            page,
            ignored: Vec::new(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(document))
    }
}
