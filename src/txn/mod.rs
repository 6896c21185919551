//! # Transaction Scope
//!
//! Wraps a unit of work in a store transaction and guarantees exactly one
//! terminal operation per invocation.
//!
//! ```ignore
//! let user = run_in_transaction(&store, &ctx, move |tx| {
//!     Box::pin(async move { users::create_user(tx, input).await })
//! })
//! .await?;
//! ```

mod context;
mod errors;
mod scope;

pub use context::RequestContext;
pub use errors::{TxError, TxResult};
pub use scope::run_in_transaction;
