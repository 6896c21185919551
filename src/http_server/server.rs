//! # HTTP Server
//!
//! The HTTP server unit: user API, health check and metrics behind the
//! standard middleware stack. Shutdown stops accepting and lets in-flight
//! requests finish; the supervisor bounds how long that may take.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::observability::MetricsRegistry;
use crate::store::{BoxFuture, Store};
use crate::supervisor::{ServerUnit, UnitError, UnitSettings};
use crate::users::UserService;

use super::config::HttpServerConfig;
use super::errors::ApiError;
use super::middleware::apply_middleware;
use super::observability_routes::observability_routes;
use super::user_routes::{user_routes, UserState};

/// HTTP server unit
pub struct HttpServer {
    config: HttpServerConfig,
    settings: UnitSettings,
    router: Router,
}

impl HttpServer {
    /// Unit name reported to the supervisor
    pub const NAME: &'static str = "http";

    pub fn new<S>(config: HttpServerConfig, users: UserService<S>, metrics: Arc<MetricsRegistry>) -> Self
    where
        S: Store + Clone + 'static,
    {
        let router = build_router(&config, users, metrics);
        Self {
            settings: config.unit_settings(),
            config,
            router,
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Prefix under which the user API is mounted
pub const API_PREFIX: &str = "/api/v1";

/// Build the combined router with all endpoints
pub fn build_router<S>(
    config: &HttpServerConfig,
    users: UserService<S>,
    metrics: Arc<MetricsRegistry>,
) -> Router
where
    S: Store + Clone + 'static,
{
    let state = UserState {
        service: users,
        metrics: Arc::clone(&metrics),
    };

    let router = Router::new()
        .merge(observability_routes(
            &config.health_check_endpoint,
            Arc::clone(&metrics),
        ))
        .nest(API_PREFIX, user_routes(state))
        .fallback(route_not_found);

    apply_middleware(router, config, metrics)
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

impl ServerUnit for HttpServer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    fn serve(
        self: Box<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> BoxFuture<'static, Result<(), UnitError>> {
        let router = self.router;
        Box::pin(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(UnitError::serve)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn server(config: HttpServerConfig) -> HttpServer {
        HttpServer::new(
            config,
            UserService::new(MemoryStore::new()),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = server(HttpServerConfig::with_port(8081));
        assert_eq!(server.socket_addr(), "0.0.0.0:8081");
        assert_eq!(server.name(), "http");
        assert_eq!(server.settings().port, 8081);
    }

    #[test]
    fn test_disabled_config_disables_unit() {
        let config = HttpServerConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!server(config).settings().enabled);
    }
}
