//! # Orders
//!
//! Orders belong to a user. They are read alongside their owner and created
//! inside the owner's transaction, so order access goes through
//! [`UserService`](crate::users::UserService).

mod model;
pub mod repository;

pub use model::{Order, OrderCreateInput, MAX_ORDER_AMOUNT_CENTS};
