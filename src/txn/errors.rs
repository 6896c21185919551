//! # Transaction Scope Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for transaction scope operations
pub type TxResult<T> = Result<T, TxError>;

/// Infrastructure failures of a transaction scope
///
/// Business errors raised by the unit of work never pass through this type;
/// they are returned unchanged.
#[derive(Debug, Clone, Error)]
pub enum TxError {
    /// The store could not open a transaction
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] StoreError),

    /// The unit of work succeeded but its writes were not committed
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] StoreError),

    /// The transaction could not be rolled back
    #[error("failed to roll back transaction: {0}")]
    Rollback(#[source] StoreError),

    /// The request was cancelled or timed out; the transaction was rolled back
    #[error("request cancelled before commit")]
    Cancelled,
}
