//! # Store Errors

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a transactable store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No connection slot became free in time
    #[error("connection pool exhausted after {0:?}")]
    PoolTimeout(Duration),

    /// The store no longer hands out connections
    #[error("store is closed")]
    Closed,

    /// Commit was refused; the transaction's writes were discarded
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Rollback could not be completed
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    /// A stored row could not be encoded or decoded
    #[error("row codec error: {0}")]
    Codec(String),

    /// Internal store error
    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
