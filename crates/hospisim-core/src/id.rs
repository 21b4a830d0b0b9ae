use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-\.]{1,64}$").ok());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id '{0}' must be 1-64 characters of [A-Za-z0-9-.]")]
    Malformed(String),
}

/// Generates a fresh server-assigned resource id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    match ID_PATTERN.as_ref() {
        Some(pattern) if pattern.is_match(id) => Ok(()),
        _ => Err(IdError::Malformed(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(validate_id(&a).is_ok());
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn rejects_bad_ids() {
        assert_eq!(validate_id(""), Err(IdError::Empty));
        assert!(validate_id("has space").is_err());
        assert!(validate_id("slash/inside").is_err());
        assert!(validate_id(&"x".repeat(65)).is_err());
        assert!(validate_id("pat-001.a").is_ok());
    }
}
