//! Prometheus metrics for hospisim processes.
//!
//! Store and publish counters are recorded by `hospisim-storage`; router counters are
//! recorded by the integration engine. Both processes serve the same text format at
//! `GET /metrics`.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub use hospisim_storage::store::{EVENTS_PUBLISHED, EVENTS_PUBLISH_FAILED, STORE_OPERATIONS};

    pub const ROUTER_MESSAGES_RECEIVED: &str = "hospisim_router_messages_received_total";
    pub const ROUTER_MESSAGES_ROUTED: &str = "hospisim_router_messages_routed_total";
    pub const ROUTER_ERRORS: &str = "hospisim_router_errors_total";
    pub const ROUTER_LOG_MIRROR_FAILED: &str = "hospisim_router_log_mirror_failed_total";
}

/// Installs the Prometheus recorder.
///
/// Returns `false` if a recorder was already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format, or `None` before [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}
