//! Request middleware
//!
//! Outermost first: request context, access log, panic recovery, timeout,
//! CORS.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

use crate::observability::{Logger, MetricsRegistry};
use crate::txn::RequestContext;

use super::config::HttpServerConfig;
use super::errors::ApiError;

/// Header carrying the request id in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Wrap `router` in the standard middleware stack
pub fn apply_middleware(
    router: Router,
    config: &HttpServerConfig,
    metrics: Arc<MetricsRegistry>,
) -> Router {
    let panic_metrics = Arc::clone(&metrics);

    router
        .layer(cors_layer(config))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(CatchPanicLayer::custom(move |payload: Box<dyn Any + Send + 'static>| {
            panic_metrics.increment_panics_recovered();
            recover_panic(payload)
        }))
        .layer(middleware::from_fn_with_state(metrics, log_requests))
        .layer(middleware::from_fn_with_state(
            config.request_timeout(),
            request_context,
        ))
}

fn cors_layer(config: &HttpServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
    }
}

/// Attach a [`RequestContext`] and echo the request id
///
/// An incoming `X-Request-ID` is reused when it is printable and short;
/// otherwise a fresh id is generated.
pub async fn request_context(
    State(timeout): State<Duration>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = RequestContext::new(request_id.clone()).with_timeout(timeout);
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// One access-log line per request; feeds the HTTP counters
pub async fn log_requests(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id().to_string())
        .unwrap_or_default();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    metrics.record_http_response(status);

    let fields = [
        ("method", method.as_str()),
        ("path", path.as_str()),
        ("status", &status.to_string()),
        ("duration_ms", &started.elapsed().as_millis().to_string()),
        ("request_id", request_id.as_str()),
    ];
    if status >= 500 {
        Logger::error("HTTP_REQUEST", &fields);
    } else {
        Logger::info("HTTP_REQUEST", &fields);
    }

    response
}

fn recover_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    Logger::error("HTTP_PANIC_RECOVERED", &[("panic", &detail)]);

    ApiError::Panic.into_response()
}
