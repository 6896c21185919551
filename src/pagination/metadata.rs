//! Pagination metadata built from a HasMore probe

use serde::{Deserialize, Serialize};

use super::window::PaginationWindow;

/// Describes the page returned to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub offset: usize,
    pub page_size: usize,
    /// Rows in this page
    pub count: usize,
    /// Whether rows exist beyond this page
    pub has_more: bool,
    /// Total matching rows, only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PaginationMetadata {
    /// Trim a probe fetch to the page and describe it
    ///
    /// `rows` is what came back for [`PaginationWindow::probe_limit`]; a
    /// surplus row means another page exists and is dropped here. `total`
    /// is discarded unless the window asked for it.
    pub fn resolve<T>(window: &PaginationWindow, rows: &mut Vec<T>, total: Option<u64>) -> Self {
        let has_more = rows.len() > window.page_size();
        rows.truncate(window.page_size());

        Self {
            offset: window.offset(),
            page_size: window.page_size(),
            count: rows.len(),
            has_more,
            total: total.filter(|_| window.include_total()),
        }
    }
}

/// A page of results with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page_info: PaginationMetadata,
}

impl<T> Page<T> {
    /// Build a page from a probe fetch
    pub fn from_probe(window: &PaginationWindow, mut rows: Vec<T>, total: Option<u64>) -> Self {
        let page_info = PaginationMetadata::resolve(window, &mut rows, total);
        Self {
            data: rows,
            page_info,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}
