use hospisim_api::ApiError;
use hospisim_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid routing pattern: {0}")]
    InvalidPattern(#[from] CoreError),

    #[error("routing rule '{0}' has no destinations")]
    NoDestinations(String),

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("forwarding to '{destination}' failed: {message}")]
    Forward {
        destination: String,
        message: String,
    },

    #[error("message payload is not valid JSON: {0}")]
    InvalidPayload(String),
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        let message = err.to_string();
        match err {
            RouterError::InvalidPattern(_)
            | RouterError::NoDestinations(_)
            | RouterError::InvalidPayload(_) => ApiError::bad_request(message),
            RouterError::UnknownService(_) => ApiError::not_found(message),
            RouterError::Forward { .. } => ApiError::internal(message),
        }
    }
}
