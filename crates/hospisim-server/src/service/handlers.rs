use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hospisim_api::{ApiError, FhirJson};
use hospisim_storage::{PublishStatsSnapshot, SearchResult};
use serde::Serialize;
use serde_json::Value;

use super::ServiceState;
use super::capability::{CapabilityStatement, capability_statement};

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    if !value.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }
    Ok(value)
}

/// `POST /resources/{type}`
pub async fn create_resource(
    State(state): State<ServiceState>,
    Path(resource_type): Path<String>,
    body: Bytes,
) -> Result<FhirJson<Value>, ApiError> {
    let body = parse_body(&body)?;
    let created = state.store.create(&resource_type, body).await?;
    Ok(FhirJson(StatusCode::CREATED, created))
}

/// `GET /resources/{type}/{id}`
pub async fn read_resource(
    State(state): State<ServiceState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<FhirJson<Value>, ApiError> {
    let document = state.store.read(&resource_type, &id).await?;
    Ok(FhirJson(StatusCode::OK, document))
}

/// `PUT /resources/{type}/{id}`
pub async fn update_resource(
    State(state): State<ServiceState>,
    Path((resource_type, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<FhirJson<Value>, ApiError> {
    let body = parse_body(&body)?;
    let updated = state.store.update(&resource_type, &id, body).await?;
    Ok(FhirJson(StatusCode::OK, updated))
}

/// `DELETE /resources/{type}/{id}`
pub async fn delete_resource(
    State(state): State<ServiceState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&resource_type, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /resources/{type}?<params>&_count=N&_offset=M`
pub async fn search_resources(
    State(state): State<ServiceState>,
    Path(resource_type): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<FhirJson<SearchResult>, ApiError> {
    let params: BTreeMap<String, String> = query
        .as_deref()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let result = state.store.search(&resource_type, &params).await?;
    Ok(FhirJson(StatusCode::OK, result))
}

/// `GET /metadata`
pub async fn metadata(State(state): State<ServiceState>) -> FhirJson<CapabilityStatement> {
    FhirJson(StatusCode::OK, capability_statement(&state.store))
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub backend: &'static str,
    pub events: EventHealth,
}

#[derive(Debug, Serialize)]
pub struct EventHealth {
    pub publisher: &'static str,
    #[serde(flatten)]
    pub counts: PublishStatsSnapshot,
}

/// `GET /health`
pub async fn health(State(state): State<ServiceState>) -> Response {
    let backend = state.store.backend();
    let (code, status) = match backend.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(backend = backend.backend_name(), error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    let body = ServiceHealth {
        status,
        service: state.store.service().as_str(),
        backend: backend.backend_name(),
        events: EventHealth {
            publisher: state.store.publisher_name(),
            counts: state.store.publish_stats(),
        },
    };
    (code, Json(body)).into_response()
}
