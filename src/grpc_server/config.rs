//! gRPC Server Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::supervisor::UnitSettings;

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcServerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 50051)
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl GrpcServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn unit_settings(&self) -> UnitSettings {
        UnitSettings {
            enabled: self.enabled,
            host: self.host.clone(),
            port: self.port,
            shutdown_timeout: self.shutdown_timeout(),
        }
    }
}
