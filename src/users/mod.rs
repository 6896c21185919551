//! # Users
//!
//! The versioned entity served by the HTTP API. Every operation runs in one
//! transaction; updates go through the optimistic lock. A user's orders are
//! read and created through the same service.

mod errors;
mod model;
pub mod repository;
mod service;

pub use errors::{UserError, UserResult};
pub use model::{User, UserCreateInput, UserUpdateInput, UserWithOrders, MAX_AGE, MIN_AGE};
pub use service::UserService;
