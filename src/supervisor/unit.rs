//! Server units and their lifecycle states

use std::fmt;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::store::BoxFuture;

use super::errors::UnitError;

/// Listen and shutdown settings of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Upper bound on the graceful drain
    pub shutdown_timeout: Duration,
}

impl UnitSettings {
    pub fn new(host: impl Into<String>, port: u16, shutdown_timeout: Duration) -> Self {
        Self {
            enabled: true,
            host: host.into(),
            port,
            shutdown_timeout,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `host:port`, with IPv6 hosts bracketed
    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

/// Join a host and port into a bindable address; `::1` becomes `[::1]:port`
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// A listener the supervisor starts, watches and stops
///
/// The supervisor binds the listener; `serve` runs the accept loop on it
/// until `shutdown` is cancelled, then drains in-flight work and returns.
/// Draining is bounded by the supervisor, not by the unit.
pub trait ServerUnit: Send + 'static {
    fn name(&self) -> &str;

    fn settings(&self) -> &UnitSettings;

    fn serve(
        self: Box<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> BoxFuture<'static, Result<(), UnitError>>;
}

/// Lifecycle state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Not started, per settings
    Disabled,
    /// Binding the listener
    Starting,
    /// Accepting connections
    Running,
    /// Draining in-flight work
    ShuttingDown,
    /// Finished, successfully or not
    Stopped,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Disabled => "disabled",
            UnitState::Starting => "starting",
            UnitState::Running => "running",
            UnitState::ShuttingDown => "shutting_down",
            UnitState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
