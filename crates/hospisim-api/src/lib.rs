use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use hospisim_core::FHIR_JSON;
use hospisim_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimal OperationOutcome representation for API error responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String, // always "OperationOutcome"
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcomeIssue {
    /// fatal | error | warning | information
    pub severity: String,
    /// Issue type code (subset used): invalid | not-found | conflict | not-supported |
    /// transient | exception
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    pub fn single(severity: &str, code: &str, diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue {
                severity: severity.to_string(),
                code: code.to_string(),
                diagnostics: Some(diagnostics.into()),
            }],
        }
    }
}

/// API errors mapped to HTTP responses with an OperationOutcome body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unsupported resource type: {0}")]
    UnsupportedType(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_operation_outcome(&self) -> OperationOutcome {
        match self {
            ApiError::BadRequest(msg) => OperationOutcome::single("error", "invalid", msg),
            ApiError::UnsupportedType(msg) => {
                OperationOutcome::single("error", "not-supported", msg)
            }
            ApiError::NotFound(msg) => OperationOutcome::single("error", "not-found", msg),
            ApiError::Conflict(msg) => OperationOutcome::single("error", "conflict", msg),
            ApiError::ServiceUnavailable(msg) => {
                OperationOutcome::single("error", "transient", msg)
            }
            ApiError::Internal(msg) => OperationOutcome::single("fatal", "exception", msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::UnsupportedType { .. } => ApiError::UnsupportedType(message),
            StorageError::NotFound { .. } => ApiError::NotFound(message),
            StorageError::AlreadyExists { .. } => ApiError::Conflict(message),
            StorageError::InvalidResource { .. } | StorageError::InvalidSearch(_) => {
                ApiError::BadRequest(message)
            }
            StorageError::ConnectionError { .. } => {
                tracing::error!(error = %message, "storage backend unavailable");
                ApiError::ServiceUnavailable(message)
            }
            StorageError::Internal { .. } => {
                tracing::error!(error = %message, "storage failure");
                ApiError::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_operation_outcome()).unwrap_or_else(|_| {
            br#"{"resourceType":"OperationOutcome","issue":[]}"#.to_vec()
        });
        let mut response = (status, body).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));
        response
    }
}

/// A JSON body served as `application/fhir+json`.
#[derive(Debug, Clone)]
pub struct FhirJson<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for FhirJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.1) {
            Ok(body) => {
                let mut response = (self.0, body).into_response();
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));
                response
            }
            Err(e) => ApiError::internal(format!("failed to encode response: {e}")).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn into_response_sets_status_and_content_type() {
        let resp = ApiError::bad_request("Invalid parameter").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static(FHIR_JSON));
    }

    #[test]
    fn storage_errors_map_to_status_codes() {
        let cases: Vec<(StorageError, StatusCode, &str)> = vec![
            (
                StorageError::unsupported_type("Claim", "ehr"),
                StatusCode::BAD_REQUEST,
                "not-supported",
            ),
            (
                StorageError::not_found("Patient", "1"),
                StatusCode::NOT_FOUND,
                "not-found",
            ),
            (
                StorageError::already_exists("Patient", "1"),
                StatusCode::CONFLICT,
                "conflict",
            ),
            (
                StorageError::invalid_resource("bad gender"),
                StatusCode::BAD_REQUEST,
                "invalid",
            ),
            (
                StorageError::connection_error("pool timed out"),
                StatusCode::SERVICE_UNAVAILABLE,
                "transient",
            ),
            (
                StorageError::internal("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "exception",
            ),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.to_operation_outcome().issue[0].code, code);
        }
    }

    #[test]
    fn operation_outcome_shape() {
        let outcome = ApiError::not_found("Patient/123").to_operation_outcome();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["resourceType"], "OperationOutcome");
        assert_eq!(json["issue"][0]["severity"], "error");
        assert_eq!(json["issue"][0]["diagnostics"], "Patient/123");
    }

    #[test]
    fn fhir_json_sets_content_type() {
        let resp = FhirJson(StatusCode::CREATED, serde_json::json!({"id": "x"})).into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static(FHIR_JSON)
        );
    }
}
