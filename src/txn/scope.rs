//! Transaction scope
//!
//! `run_in_transaction` owns the transaction from `begin` until exactly one
//! terminal operation. The unit of work borrows it as `&mut S::Tx`, so a
//! transaction can only be reached while its scope is active.
//!
//! Exit paths:
//! - work returns `Ok` and the request is live: commit
//! - work returns `Err`: rollback, the error is returned unchanged
//! - request cancelled or past its deadline: rollback, `TxError::Cancelled`
//! - work panics or the caller drops this future: the guard's `Drop`
//!   releases the transaction, which the store rolls back; a panic keeps
//!   unwinding

use crate::observability::Logger;
use crate::store::{BoxFuture, Store, Transaction};

use super::context::RequestContext;
use super::errors::{TxError, TxResult};

/// Run `work` inside a fresh transaction from `store`
///
/// Captures of `work` must be owned (`move`), since the returned future only
/// borrows the transaction.
pub async fn run_in_transaction<S, T, E, F>(store: &S, ctx: &RequestContext, work: F) -> Result<T, E>
where
    S: Store,
    T: Send,
    E: From<TxError> + Send,
    F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let tx = match store.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            Logger::error(
                "TX_BEGIN_FAILED",
                &[("request_id", ctx.request_id()), ("error", &e.to_string())],
            );
            return Err(TxError::Begin(e).into());
        }
    };

    let mut guard = TxGuard::new(tx, ctx.request_id());

    let outcome = {
        let unit = work(guard.tx_mut());
        tokio::select! {
            biased;
            _ = ctx.done() => None,
            result = unit => Some(result),
        }
    };

    match outcome {
        Some(Ok(value)) if !ctx.is_cancelled() => {
            guard.commit().await?;
            Ok(value)
        }
        Some(Err(e)) => {
            // The business error wins over a failed rollback
            let _ = guard.rollback("error").await;
            Err(e)
        }
        Some(Ok(_)) | None => {
            guard.rollback("cancelled").await?;
            Err(TxError::Cancelled.into())
        }
    }
}

/// Holds the live transaction; releasing it on drop rolls it back
struct TxGuard<'c, Tx: Transaction> {
    tx: Option<Tx>,
    request_id: &'c str,
    tx_id: String,
}

impl<'c, Tx: Transaction> TxGuard<'c, Tx> {
    fn new(tx: Tx, request_id: &'c str) -> Self {
        let tx_id = tx.id().to_string();
        Logger::trace("TX_BEGIN", &[("request_id", request_id), ("tx_id", &tx_id)]);
        Self {
            tx: Some(tx),
            request_id,
            tx_id,
        }
    }

    fn tx_mut(&mut self) -> &mut Tx {
        self.tx
            .as_mut()
            .expect("transaction is live until commit or rollback")
    }

    async fn commit(mut self) -> TxResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        match tx.commit().await {
            Ok(()) => {
                Logger::trace(
                    "TX_COMMIT",
                    &[("request_id", self.request_id), ("tx_id", &self.tx_id)],
                );
                Ok(())
            }
            Err(e) => {
                Logger::error(
                    "TX_COMMIT_FAILED",
                    &[
                        ("error", &e.to_string()),
                        ("request_id", self.request_id),
                        ("tx_id", &self.tx_id),
                    ],
                );
                Err(TxError::Commit(e))
            }
        }
    }

    async fn rollback(mut self, reason: &str) -> TxResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        match tx.rollback().await {
            Ok(()) => {
                Logger::info(
                    "TX_ROLLBACK",
                    &[
                        ("reason", reason),
                        ("request_id", self.request_id),
                        ("tx_id", &self.tx_id),
                    ],
                );
                Ok(())
            }
            Err(e) => {
                Logger::error(
                    "TX_ROLLBACK_FAILED",
                    &[
                        ("error", &e.to_string()),
                        ("reason", reason),
                        ("request_id", self.request_id),
                        ("tx_id", &self.tx_id),
                    ],
                );
                Err(TxError::Rollback(e))
            }
        }
    }
}

impl<Tx: Transaction> Drop for TxGuard<'_, Tx> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let reason = if std::thread::panicking() {
                "panic"
            } else {
                "abandoned"
            };
            Logger::warn(
                "TX_ROLLBACK",
                &[
                    ("reason", reason),
                    ("request_id", self.request_id),
                    ("tx_id", &self.tx_id),
                ],
            );
            drop(tx);
        }
    }
}
