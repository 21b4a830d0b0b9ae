use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use hospisim_api::ApiError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::IntegrationState;
use crate::broker::InboundMessage;
use super::log::RouterLogEntry;
use super::registry::ServiceHealth;
use super::stats::RouterStatsSnapshot;

/// Routing key used by `POST /route` when the body does not name one.
pub const MANUAL_ROUTING_KEY: &str = "manual.test.message";
const DEFAULT_MESSAGE_LIMIT: usize = 100;

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub stats: RouterStatsSnapshot,
    pub routing_rules: usize,
    pub connected_services: Vec<String>,
}

/// `GET /stats`
pub async fn stats(State(state): State<IntegrationState>) -> Json<StatsResponse> {
    let engine = &state.engine;
    Json(StatsResponse {
        stats: engine.stats(),
        routing_rules: engine.routing_table().len(),
        connected_services: engine.registry().names(),
    })
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<RouterLogEntry>,
    pub total: usize,
}

/// `GET /messages?limit=N`: the newest N entries, oldest first.
pub async fn list_messages(
    State(state): State<IntegrationState>,
    Query(query): Query<MessagesQuery>,
) -> Json<MessagesResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
    Json(MessagesResponse {
        messages: state.engine.recent_messages(limit),
        total: state.engine.message_count(),
    })
}

/// `GET /messages/{id}`
pub async fn get_message(
    State(state): State<IntegrationState>,
    Path(id): Path<String>,
) -> Result<Json<RouterLogEntry>, ApiError> {
    state
        .engine
        .message(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Message {id} not found")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub status: &'static str,
    pub routing_key: String,
}

/// `POST /route`: routes the body as if it had arrived on `routing_key`. With a
/// consumer running the message is queued behind broker traffic, so the response
/// does not wait for routing to finish.
pub async fn manual_route(
    State(state): State<IntegrationState>,
    body: Bytes,
) -> Result<Json<RouteResponse>, ApiError> {
    let message: Value = parse_json(&body)?;
    if !message.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }
    let routing_key = message
        .get("routing_key")
        .and_then(Value::as_str)
        .unwrap_or(MANUAL_ROUTING_KEY)
        .to_string();
    match &state.inbound {
        Some(inbound) => inbound
            .send(InboundMessage {
                routing_key: routing_key.clone(),
                payload: message.to_string(),
            })
            .await
            .map_err(|_| ApiError::service_unavailable("Message consumer is not running"))?,
        None => {
            state.engine.process(&routing_key, &message).await;
        }
    }
    Ok(Json(RouteResponse {
        status: "routed",
        routing_key,
    }))
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub rules: IndexMap<String, Vec<String>>,
}

/// `GET /rules`
pub async fn list_rules(State(state): State<IntegrationState>) -> Json<RulesResponse> {
    Json(RulesResponse {
        rules: state.engine.routing_table().to_map(),
    })
}

#[derive(Debug, Deserialize)]
pub struct AddRuleRequest {
    pub pattern: String,
    pub destinations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddRuleResponse {
    pub status: &'static str,
    pub pattern: String,
    pub destinations: Vec<String>,
}

/// `POST /rules`
pub async fn add_rule(
    State(state): State<IntegrationState>,
    body: Bytes,
) -> Result<Json<AddRuleResponse>, ApiError> {
    let request: AddRuleRequest = parse_json(&body)?;
    let rule = state.engine.add_rule(&request.pattern, request.destinations)?;
    Ok(Json(AddRuleResponse {
        status: "added",
        pattern: rule.pattern.as_str().to_string(),
        destinations: rule.destinations,
    }))
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: IndexMap<String, String>,
}

/// `GET /services`
pub async fn list_services(State(state): State<IntegrationState>) -> Json<ServicesResponse> {
    let services = state
        .engine
        .registry()
        .services()
        .iter()
        .map(|(name, url)| (name.clone(), url.as_str().trim_end_matches('/').to_string()))
        .collect();
    Json(ServicesResponse { services })
}

/// `GET /services/{name}/health`
pub async fn service_health(
    State(state): State<IntegrationState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceHealth>, ApiError> {
    Ok(Json(state.engine.check_service_health(&name).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub broker: &'static str,
    pub log_mirror: MirrorHealth,
}

#[derive(Debug, Serialize)]
pub struct MirrorHealth {
    pub backend: &'static str,
    pub failures: u64,
}

/// `GET /health`
pub async fn health(State(state): State<IntegrationState>) -> Json<EngineHealth> {
    Json(EngineHealth {
        status: "healthy",
        service: "integration-engine",
        broker: state.broker.get().as_str(),
        log_mirror: MirrorHealth {
            backend: state.engine.mirror_name(),
            failures: state.engine.mirror_failures(),
        },
    })
}
