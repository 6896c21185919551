//! # HTTP Server Module
//!
//! The axum-based server unit.
//!
//! # Endpoints
//!
//! - `{health_check_endpoint}` - Health check (default `/health-check`)
//! - `/metrics` - Metrics snapshot
//! - `/api/v1/users` - User API

pub mod config;
pub mod errors;
pub mod middleware;
pub mod observability_routes;
pub mod server;
pub mod user_routes;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use middleware::{apply_middleware, REQUEST_ID_HEADER};
pub use observability_routes::METRICS_ENDPOINT;
pub use server::{build_router, HttpServer, API_PREFIX};
