//! Supervisor errors

use std::time::Duration;

use thiserror::Error;

/// Why a single server unit failed
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serve error: {0}")]
    Serve(String),

    #[error("unit panicked: {0}")]
    Panicked(String),

    #[error("graceful shutdown did not finish within {}ms", .timeout.as_millis())]
    ShutdownTimeout { timeout: Duration },
}

impl UnitError {
    pub fn serve(err: impl std::fmt::Display) -> Self {
        UnitError::Serve(err.to_string())
    }

    pub fn is_shutdown_timeout(&self) -> bool {
        matches!(self, UnitError::ShutdownTimeout { .. })
    }
}

/// A unit error tagged with the unit's name
#[derive(Debug, Error)]
#[error("{unit}: {error}")]
pub struct UnitFailure {
    pub unit: String,
    #[source]
    pub error: UnitError,
}

/// Every unit failure observed during one supervisor run
#[derive(Debug, Error)]
#[error("{} server unit(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct SupervisorError {
    failures: Vec<UnitFailure>,
}

impl SupervisorError {
    pub(crate) fn new(failures: Vec<UnitFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    /// The failure reported by `unit`, if any
    pub fn failure_for(&self, unit: &str) -> Option<&UnitError> {
        self.failures
            .iter()
            .find(|f| f.unit == unit)
            .map(|f| &f.error)
    }

    pub fn into_failures(self) -> Vec<UnitFailure> {
        self.failures
    }
}

fn summarize(failures: &[UnitFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
