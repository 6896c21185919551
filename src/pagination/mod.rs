//! # Pagination
//!
//! Offset/limit windows with a HasMore probe: callers fetch
//! `page_size + 1` rows and [`PaginationMetadata::resolve`] trims the surplus,
//! so the common path needs a single query. A separate count query is the
//! caller's job and only runs when `include_total` was requested.

mod metadata;
mod window;

pub use metadata::{Page, PaginationMetadata};
pub use window::{
    PaginationDefaults, PaginationParams, PaginationWindow, DEFAULT_OFFSET, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
