//! Search parameter descriptors.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::SearchError;

/// Search parameter type as advertised in capability documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamType {
    String,
    Token,
    Reference,
}

impl SearchParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Token => "token",
            Self::Reference => "reference",
        }
    }
}

/// Dotted path into a document, e.g. `subject.reference`.
///
/// Segments are restricted to `[A-Za-z0-9_]` so they can be inlined into a JSONB path
/// literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, SearchError> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        let valid = segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
        if !valid {
            return Err(SearchError::InvalidFieldPath(raw.to_string()));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |node, segment| node.get(segment))
    }

    /// PostgreSQL text-array path literal: `'{subject,reference}'`.
    pub fn pg_path(&self) -> String {
        format!("'{{{}}}'", self.0.join(","))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// How the value at a field path is compared with the parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// String equality.
    Exact,
    /// String equality against `prefix + value`.
    Prefixed(String),
    /// Substring containment.
    Contains,
    /// Array of objects; some element's `field` equals the value.
    ArrayField(String),
    /// Array of codings; some element's `code` equals the value.
    CodingCode,
    /// One concept or an array of concepts; some concept has a coding whose `code`
    /// equals the value.
    ConceptCode,
}

fn has_code(codings: &Value, code: &str) -> bool {
    codings.as_array().is_some_and(|items| {
        items
            .iter()
            .any(|c| c.get("code").and_then(Value::as_str) == Some(code))
    })
}

impl MatchKind {
    /// Evaluates against the value found at the descriptor's path.
    pub fn matches(&self, found: &Value, expected: &str) -> bool {
        match self {
            Self::Exact => found.as_str() == Some(expected),
            Self::Prefixed(prefix) => found
                .as_str()
                .and_then(|s| s.strip_prefix(prefix.as_str()))
                .is_some_and(|rest| rest == expected),
            Self::Contains => found.as_str().is_some_and(|s| s.contains(expected)),
            Self::ArrayField(field) => found.as_array().is_some_and(|items| {
                items
                    .iter()
                    .any(|item| item.get(field).and_then(Value::as_str) == Some(expected))
            }),
            Self::CodingCode => has_code(found, expected),
            Self::ConceptCode => match found {
                Value::Array(concepts) => concepts
                    .iter()
                    .filter_map(|concept| concept.get("coding"))
                    .any(|codings| has_code(codings, expected)),
                Value::Object(concept) => concept
                    .get("coding")
                    .is_some_and(|codings| has_code(codings, expected)),
                _ => false,
            },
        }
    }
}

/// A registered search parameter: name, advertised type, field path and matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParamDef {
    pub name: String,
    pub param_type: SearchParamType,
    pub path: FieldPath,
    pub kind: MatchKind,
}

impl SearchParamDef {
    pub fn new(
        name: impl Into<String>,
        param_type: SearchParamType,
        path: &str,
        kind: MatchKind,
    ) -> Result<Self, SearchError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('_') {
            return Err(SearchError::invalid_parameter(
                name,
                "names must be non-empty and must not start with '_'",
            ));
        }
        Ok(Self {
            name,
            param_type,
            path: FieldPath::parse(path)?,
            kind,
        })
    }

    /// True when `document` satisfies this parameter for `value`.
    pub fn matches(&self, document: &Value, value: &str) -> bool {
        self.path
            .resolve(document)
            .is_some_and(|found| self.kind.matches(found, value))
    }
}
