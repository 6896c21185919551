//! User domain errors

use thiserror::Error;

use crate::occ::{ConcurrencyError, Version};
use crate::store::{RecordId, StoreError};
use crate::txn::TxError;

/// Result type for user operations
pub type UserResult<T> = Result<T, UserError>;

#[derive(Debug, Clone, Error)]
pub enum UserError {
    #[error("user {id} not found")]
    NotFound { id: RecordId },

    #[error("user with email '{email}' already exists")]
    AlreadyExists { email: String },

    #[error("{0}")]
    Validation(String),

    #[error("user {id} was modified concurrently (expected version {expected})")]
    Conflict {
        id: RecordId,
        expected: Version,
        actual: Option<Version>,
    },

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Transaction(#[from] TxError),
}

impl UserError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            UserError::NotFound { .. } => "USER_NOT_FOUND",
            UserError::AlreadyExists { .. } => "USER_ALREADY_EXISTS",
            UserError::Validation(_) => "USER_VALIDATION_FAILED",
            UserError::Conflict { .. } => "USER_VERSION_CONFLICT",
            UserError::Store(StoreError::PoolTimeout(_))
            | UserError::Transaction(TxError::Begin(StoreError::PoolTimeout(_))) => {
                "STORE_UNAVAILABLE"
            }
            UserError::Store(_) => "STORE_ERROR",
            UserError::Transaction(TxError::Cancelled) => "REQUEST_CANCELLED",
            UserError::Transaction(_) => "TRANSACTION_FAILED",
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            UserError::NotFound { .. } => 404,
            UserError::AlreadyExists { .. } | UserError::Validation(_) => 400,
            UserError::Conflict { .. } => 409,
            UserError::Transaction(TxError::Cancelled) => 408,
            UserError::Transaction(TxError::Begin(StoreError::PoolTimeout(_)))
            | UserError::Store(StoreError::PoolTimeout(_)) => 503,
            UserError::Store(_) | UserError::Transaction(_) => 500,
        }
    }

    /// Whether this is an infrastructure failure rather than a business outcome
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, UserError::Store(_) | UserError::Transaction(_))
    }
}

impl From<ConcurrencyError> for UserError {
    fn from(err: ConcurrencyError) -> Self {
        match err {
            ConcurrencyError::Conflict {
                id,
                expected,
                actual,
            } => UserError::Conflict {
                id,
                expected,
                actual,
            },
            ConcurrencyError::NotFound { id } => UserError::NotFound { id },
            ConcurrencyError::InvalidMutation(msg) => UserError::Validation(msg),
            ConcurrencyError::Store(e) => UserError::Store(e),
        }
    }
}
