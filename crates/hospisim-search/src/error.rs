use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Invalid field path '{0}'")]
    InvalidFieldPath(String),
}

impl SearchError {
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}
