//! # Optimistic Concurrency Errors

use thiserror::Error;

use crate::store::{RecordId, StoreError};

use super::Version;

/// Errors raised by versioned reads and writes
#[derive(Debug, Clone, Error)]
pub enum ConcurrencyError {
    /// Another writer advanced the version since the caller read it
    #[error("version conflict on record {id}: expected version {expected}")]
    Conflict {
        id: RecordId,
        expected: Version,
        /// Version observed after the failed write, when it was re-read
        actual: Option<Version>,
    },

    /// The record does not exist (only reported by the checked update)
    #[error("record {id} not found")]
    NotFound { id: RecordId },

    /// The mutation could not be expressed as column values
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// Store failure
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for ConcurrencyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(StoreError::from(e))
    }
}
