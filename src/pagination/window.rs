//! Pagination windows
//!
//! Inputs are normalized, never rejected: a negative offset becomes the
//! default offset and a non-positive page size becomes the default page
//! size. Query-string inputs that fail to parse are treated the same way.

use serde::Deserialize;

use crate::store::Query;

/// Offset used when none (or a negative one) is given
pub const DEFAULT_OFFSET: usize = 0;

/// Page size used when none (or a non-positive one) is given
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Upper bound on a single page
pub const MAX_PAGE_SIZE: usize = 1000;

/// Fallbacks applied during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationDefaults {
    pub offset: usize,
    pub page_size: usize,
    pub include_total: bool,
    pub max_page_size: usize,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            page_size: DEFAULT_PAGE_SIZE,
            include_total: false,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PaginationDefaults {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_include_total(mut self, include_total: bool) -> Self {
        self.include_total = include_total;
        self
    }
}

/// A normalized `{offset, page_size, include_total}` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    offset: usize,
    page_size: usize,
    include_total: bool,
}

impl PaginationWindow {
    /// Normalize raw inputs with the default fallbacks
    pub fn new(offset: i64, page_size: i64, include_total: bool) -> Self {
        Self::with_defaults(offset, page_size, include_total, &PaginationDefaults::default())
    }

    /// Normalize raw inputs with custom fallbacks
    pub fn with_defaults(
        offset: i64,
        page_size: i64,
        include_total: bool,
        defaults: &PaginationDefaults,
    ) -> Self {
        let offset = usize::try_from(offset).unwrap_or(defaults.offset);
        let page_size = match usize::try_from(page_size) {
            Ok(0) | Err(_) => defaults.page_size,
            Ok(n) => n,
        };

        Self {
            offset,
            page_size: page_size.clamp(1, defaults.max_page_size.max(1)),
            include_total: include_total || defaults.include_total,
        }
    }

    /// Parse query-string values defensively
    pub fn from_query(
        offset: Option<&str>,
        page_size: Option<&str>,
        include_total: Option<&str>,
    ) -> Self {
        Self::from_query_with_defaults(offset, page_size, include_total, &PaginationDefaults::default())
    }

    /// Parse query-string values defensively with custom fallbacks
    pub fn from_query_with_defaults(
        offset: Option<&str>,
        page_size: Option<&str>,
        include_total: Option<&str>,
        defaults: &PaginationDefaults,
    ) -> Self {
        let offset = parse_or(offset, defaults.offset as i64);
        let page_size = parse_or(page_size, defaults.page_size as i64);
        let include_total = include_total.map(str::trim) == Some("true");

        Self::with_defaults(offset, page_size, include_total, defaults)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn include_total(&self) -> bool {
        self.include_total
    }

    /// Rows to fetch: one beyond the page, to detect a following page
    pub fn probe_limit(&self) -> usize {
        self.page_size + 1
    }

    /// Store query reading this window plus the probe row
    pub fn probe_query(&self) -> Query {
        Query::all().window(self.offset, self.probe_limit())
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET as i64, DEFAULT_PAGE_SIZE as i64, false)
    }
}

fn parse_or(value: Option<&str>, fallback: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(fallback)
}

/// Raw pagination query parameters (`offset`, `pageSize`, `includeTotal`)
///
/// Kept as strings so malformed values fall back to defaults instead of
/// failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub offset: Option<String>,
    pub page_size: Option<String>,
    pub include_total: Option<String>,
}

impl PaginationParams {
    pub fn window(&self) -> PaginationWindow {
        PaginationWindow::from_query(
            self.offset.as_deref(),
            self.page_size.as_deref(),
            self.include_total.as_deref(),
        )
    }
}
