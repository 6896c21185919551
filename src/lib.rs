//! txserve - transactional request lifecycle for a CRUD backend
//!
//! - `store`: transactable store capability and an in-memory implementation
//! - `txn`: transaction scope with exactly one commit or rollback
//! - `occ`: version-token compare-and-swap updates
//! - `pagination`: offset windows with a HasMore probe
//! - `users`, `orders`: the versioned entities served over HTTP
//! - `supervisor`: concurrent server units with bounded graceful shutdown

pub mod app;
pub mod cli;
pub mod config;
pub mod grpc_server;
pub mod http_server;
pub mod observability;
pub mod occ;
pub mod orders;
pub mod pagination;
pub mod store;
pub mod supervisor;
pub mod txn;
pub mod users;
