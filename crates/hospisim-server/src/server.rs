use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::integration::{IntegrationState, handlers as router_handlers};
use crate::metrics::metrics_handler;
use crate::middleware as app_middleware;
use crate::service::{ServiceState, handlers as service_handlers};

/// REST surface of one clinical service.
pub fn build_service_app(state: ServiceState, cfg: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/health", get(service_handlers::health))
        .route("/metadata", get(service_handlers::metadata))
        .route("/metrics", get(metrics_handler))
        .route(
            "/resources/{resource_type}",
            get(service_handlers::search_resources).post(service_handlers::create_resource),
        )
        .route(
            "/resources/{resource_type}/{id}",
            get(service_handlers::read_resource)
                .put(service_handlers::update_resource)
                .delete(service_handlers::delete_resource),
        )
        .with_state(state);
    with_common_layers(app, cfg)
}

/// REST surface of the integration engine.
pub fn build_integration_app(state: IntegrationState, cfg: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/health", get(router_handlers::health))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(router_handlers::stats))
        .route("/messages", get(router_handlers::list_messages))
        .route("/messages/{id}", get(router_handlers::get_message))
        .route("/route", post(router_handlers::manual_route))
        .route(
            "/rules",
            get(router_handlers::list_rules).post(router_handlers::add_rule),
        )
        .route("/services", get(router_handlers::list_services))
        .route(
            "/services/{name}/health",
            get(router_handlers::service_health),
        )
        .with_state(state);
    with_common_layers(app, cfg)
}

// Order: request id -> cors/compression -> trace -> body limit
fn with_common_layers(app: Router, cfg: &ServerConfig) -> Router {
    app.layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(cfg.body_limit_bytes))
}

pub struct HospisimServer {
    addr: SocketAddr,
    app: Router,
}

impl HospisimServer {
    pub fn new(addr: SocketAddr, app: Router) -> Self {
        Self { addr, app }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
