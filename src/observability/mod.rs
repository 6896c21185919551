//! Observability subsystem
//!
//! - Structured logging (JSON, one line per event)
//! - Lock-free request counters
//!
//! ```ignore
//! use txserve::observability::{Logger, MetricsRegistry};
//!
//! Logger::info("TX_COMMIT", &[("request_id", "10.0.0.1-3fa2c1d0")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.record_http_response(200);
//! ```

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
