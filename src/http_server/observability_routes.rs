//! Observability HTTP Routes
//!
//! Liveness check and metrics snapshot.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::observability::MetricsRegistry;

/// Path of the metrics snapshot
pub const METRICS_ENDPOINT: &str = "/metrics";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check at `endpoint` and metrics at [`METRICS_ENDPOINT`]
pub fn observability_routes(endpoint: &str, metrics: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route(endpoint, get(health_handler))
        .route(METRICS_ENDPOINT, get(metrics_handler))
        .with_state(metrics)
}

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (StatusCode::OK, Json(metrics.snapshot()))
}
