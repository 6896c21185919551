//! HTTP Server Configuration
//!
//! Listen address, shutdown bound, CORS and request handling settings for
//! the HTTP unit.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::supervisor::{join_host_port, UnitSettings};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Whether the unit is started (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful drain bound in milliseconds (default: 10000)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Per-request timeout in milliseconds (default: 30000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Path of the liveness endpoint (default: "/health-check")
    #[serde(default = "default_health_check_endpoint")]
    pub health_check_endpoint: String,

    /// CORS allowed origins; empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_health_check_endpoint() -> String {
    "/health-check".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(), // Vite dev server
        "http://localhost:3000".to_string(),
    ]
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            health_check_endpoint: default_health_check_endpoint(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Supervisor view of these settings
    pub fn unit_settings(&self) -> UnitSettings {
        UnitSettings {
            enabled: self.enabled,
            host: self.host.clone(),
            port: self.port,
            shutdown_timeout: self.shutdown_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.health_check_endpoint, "/health-check");
        assert!(!config.cors_origins.is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = HttpServerConfig::with_port(9090);
        assert_eq!(config.socket_addr(), "0.0.0.0:9090");

        let ipv6 = HttpServerConfig {
            host: "::1".to_string(),
            ..HttpServerConfig::with_port(9090)
        };
        assert_eq!(ipv6.socket_addr(), "[::1]:9090");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HttpServerConfig =
            serde_json::from_str(r#"{"port": 7000, "shutdown_timeout_ms": 1500}"#).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.unit_settings().shutdown_timeout, Duration::from_millis(1500));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
