//! # Application configuration
//!
//! One JSON file; every field has a default, so `{}` is a valid config.
//!
//! ```json
//! {
//!   "env": "dev",
//!   "http_server": { "port": 8080, "shutdown_timeout_ms": 10000 },
//!   "grpc_server": { "enabled": false },
//!   "logging": { "level": "info" },
//!   "database": { "max_connections": 16, "acquire_timeout_ms": 5000 }
//! }
//! ```

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grpc_server::GrpcServerConfig;
use crate::http_server::{HttpServerConfig, API_PREFIX, METRICS_ENDPOINT};
use crate::observability::Severity;
use crate::store::MemoryStoreConfig;

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum severity: trace, debug, info, warn, error, fatal
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.level
            .parse()
            .map_err(|e: String| ConfigError::invalid(format!("logging.level: {}", e)))
    }
}

/// Store connection pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> usize {
    16
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn store_config(&self) -> MemoryStoreConfig {
        MemoryStoreConfig {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment label, logged at startup
    #[serde(default = "default_env")]
    pub env: String,

    #[serde(default)]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub grpc_server: GrpcServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_env() -> String {
    "dev".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            http_server: HttpServerConfig::default(),
            grpc_server: GrpcServerConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let http = &self.http_server;
        if http.host.trim().is_empty() {
            return Err(ConfigError::invalid("http_server.host must not be empty"));
        }
        if http.shutdown_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "http_server.shutdown_timeout_ms must be > 0",
            ));
        }
        if http.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "http_server.request_timeout_ms must be > 0",
            ));
        }
        check_health_check_endpoint(&http.health_check_endpoint)?;

        let grpc = &self.grpc_server;
        if grpc.host.trim().is_empty() {
            return Err(ConfigError::invalid("grpc_server.host must not be empty"));
        }
        if grpc.shutdown_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "grpc_server.shutdown_timeout_ms must be > 0",
            ));
        }

        let clash = http.enabled
            && grpc.enabled
            && http.port != 0
            && http.port == grpc.port
            && http.host == grpc.host;
        if clash {
            return Err(ConfigError::invalid(format!(
                "http_server and grpc_server both listen on {}",
                http.socket_addr()
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections must be > 0"));
        }

        self.logging.severity()?;

        Ok(())
    }
}

/// The health check is mounted as a plain static route next to the
/// metrics and user routes, so it must not collide with them
fn check_health_check_endpoint(endpoint: &str) -> ConfigResult<()> {
    let invalid = |reason: &str| {
        ConfigError::invalid(format!(
            "http_server.health_check_endpoint {}: '{}'",
            reason, endpoint
        ))
    };

    if !endpoint.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if endpoint
        .chars()
        .any(|c| matches!(c, ':' | '*' | '{' | '}' | '?' | '#') || c.is_whitespace())
    {
        return Err(invalid("must be a literal path"));
    }
    if endpoint == METRICS_ENDPOINT {
        return Err(invalid("is reserved for metrics"));
    }
    let under_api = endpoint
        .strip_prefix(API_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if under_api {
        return Err(invalid("overlaps the user API"));
    }

    Ok(())
}
