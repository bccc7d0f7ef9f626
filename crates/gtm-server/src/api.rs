//! Query and admin HTTP surface for the poller.

use crate::metrics::MetricsRegistry;
use crate::supervisor::SupervisorHandle;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use healthcheck::{Config, HealthTable};
use prometheus_client::encoding::text::encode;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;
use validator::Validate;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    /// Active configuration, swapped atomically on POST /config
    pub config: Arc<RwLock<Config>>,

    /// The health table pollers write into
    pub table: Arc<HealthTable>,

    /// Cancellation handle of the running generation
    pub supervisor: SupervisorHandle,

    /// Metrics registry served at /metrics
    pub metrics: Arc<MetricsRegistry>,
}

/// Build the poller's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/healthtable", get(get_table))
        .route("/health/{pool}", get(get_pool_ip))
        .route("/config", get(get_config).post(post_config))
        .route("/cancel", get(cancel_pollers))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Kubernetes liveness route
async fn livez() -> &'static str {
    "Healthy\n"
}

/// Kubernetes readiness route
async fn readyz() -> &'static str {
    "Ready\n"
}

/// JSON dump of the whole health table
async fn get_table(State(state): State<AppState>) -> Response {
    match state.table.snapshot_json().await {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "unable to marshal health table");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Plain-text IP of the first healthy member of a pool
async fn get_pool_ip(
    State(state): State<AppState>,
    Path(pool): Path<String>,
) -> (StatusCode, String) {
    match state.table.first_healthy_ip(&pool).await {
        Ok(ip) => (StatusCode::OK, ip.to_string()),
        Err(e) => (StatusCode::NOT_FOUND, format!("{e}\n")),
    }
}

/// JSON of the active configuration
async fn get_config(State(state): State<AppState>) -> Response {
    let config = state.config.read().await.clone();
    axum::Json(config).into_response()
}

/// Replace the active configuration.
///
/// The body is decoded into a temporary config and validated before the
/// swap; a bad payload changes nothing. Acceptance cancels the running
/// generation so the supervisor restarts against the new pools.
async fn post_config(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let incoming: Config = match serde_json::from_str(&body) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "unable to parse config body");
            return (StatusCode::BAD_REQUEST, "Unable to parse body\n".to_string());
        }
    };

    if let Err(e) = incoming.validate() {
        warn!(error = %e, "rejecting invalid config");
        return (StatusCode::BAD_REQUEST, format!("Invalid configuration: {e}\n"));
    }

    *state.config.write().await = incoming;
    state.supervisor.cancel().await;

    (StatusCode::ACCEPTED, "OK\n".to_string())
}

/// Cancel the running pollers, forcing a supervisor restart
async fn cancel_pollers(State(state): State<AppState>) -> (StatusCode, String) {
    state.supervisor.cancel().await;
    (StatusCode::OK, "cancelling pollers\n".to_string())
}

/// Prometheus exposition of the metrics registry
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &state.metrics.registry) {
        warn!(error = %e, "failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
