//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exactness per counter, not across counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Request-path counters shared by the server units
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Requests received by the HTTP unit
    http_requests: AtomicU64,
    /// Responses with a 4xx status
    http_client_errors: AtomicU64,
    /// Responses with a 5xx status
    http_server_errors: AtomicU64,
    /// Handler panics converted to 500 by the recovery layer
    panics_recovered: AtomicU64,
    /// Optimistic lock conflicts reported to callers
    optimistic_conflicts: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed HTTP request and its status class
    pub fn record_http_response(&self, status: u16) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.http_client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.http_server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Increment recovered panics
    pub fn increment_panics_recovered(&self) {
        self.panics_recovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment optimistic lock conflicts
    pub fn increment_optimistic_conflicts(&self) {
        self.optimistic_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http_requests: self.http_requests.load(Ordering::Relaxed),
            http_client_errors: self.http_client_errors.load(Ordering::Relaxed),
            http_server_errors: self.http_server_errors.load(Ordering::Relaxed),
            panics_recovered: self.panics_recovered.load(Ordering::Relaxed),
            optimistic_conflicts: self.optimistic_conflicts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub http_requests: u64,
    pub http_client_errors: u64,
    pub http_server_errors: u64,
    pub panics_recovered: u64,
    pub optimistic_conflicts: u64,
}
