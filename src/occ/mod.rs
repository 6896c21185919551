//! # Optimistic Concurrency Control
//!
//! Writers to the same record are arbitrated by a version token compared at
//! write time instead of a lock held across the read-then-write window.
//! Conflicts are an expected outcome, reported as
//! [`ConcurrencyError::Conflict`] and never retried here.

mod entity;
mod errors;
mod update;

pub use entity::{decode, encode, find, insert, select, Version, Versioned, INITIAL_VERSION, MAX_VERSION, VERSION_COLUMN};
pub use errors::ConcurrencyError;
pub use update::{update_versioned, update_versioned_checked, Mutation};
