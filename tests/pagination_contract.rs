//! Pagination Contract Tests
//!
//! - a full page with rows beyond it reports `has_more`
//! - a page that ends exactly at the last row does not
//! - `total` appears only when requested
//! - malformed or out-of-range inputs are normalized, never rejected

use serde_json::json;
use txserve::pagination::{Page, PaginationMetadata, PaginationParams, PaginationWindow, DEFAULT_PAGE_SIZE};
use txserve::store::{MemoryStore, Query, Record, Store, Transaction};
use txserve::txn::RequestContext;
use txserve::users::{UserCreateInput, UserService};

// =============================================================================
// Helper Functions
// =============================================================================

async fn store_with_rows(n: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    for i in 0..n {
        let fields = json!({"n": i}).as_object().cloned().unwrap();
        tx.insert("rows", fields).await.unwrap();
    }
    tx.commit().await.unwrap();
    store
}

async fn fetch(store: &MemoryStore, window: &PaginationWindow) -> Page<Record> {
    let mut tx = store.begin().await.unwrap();
    let rows = tx.select("rows", window.probe_query()).await.unwrap();
    let total = if window.include_total() {
        Some(tx.count("rows", Query::all()).await.unwrap())
    } else {
        None
    };
    tx.rollback().await.unwrap();
    Page::from_probe(window, rows, total)
}

// =============================================================================
// HasMore Probe Tests
// =============================================================================

/// Five rows, page size two, from the start: two rows and more to come.
#[tokio::test]
async fn test_first_page_has_more() {
    let store = store_with_rows(5).await;
    let window = PaginationWindow::new(0, 2, false);

    let page = fetch(&store, &window).await;

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.page_info.count, 2);
    assert!(page.page_info.has_more);
    assert_eq!(page.data[0].id, 1);
}

/// Exactly page-size rows remaining: the page is full and the last one.
#[tokio::test]
async fn test_exact_last_page_has_no_more() {
    let store = store_with_rows(5).await;
    let window = PaginationWindow::new(3, 2, false);

    let page = fetch(&store, &window).await;

    assert_eq!(page.page_info.count, 2);
    assert!(!page.page_info.has_more);
    assert_eq!(page.data[1].id, 5);
}

/// An offset past the end yields an empty final page.
#[tokio::test]
async fn test_offset_past_end() {
    let store = store_with_rows(3).await;
    let page = fetch(&store, &PaginationWindow::new(10, 2, true)).await;

    assert!(page.data.is_empty());
    assert!(!page.page_info.has_more);
    assert_eq!(page.page_info.total, Some(3));
}

/// Total is counted only when asked for.
#[tokio::test]
async fn test_total_only_when_requested() {
    let store = store_with_rows(4).await;

    let without = fetch(&store, &PaginationWindow::new(0, 2, false)).await;
    assert_eq!(without.page_info.total, None);

    let with = fetch(&store, &PaginationWindow::new(0, 2, true)).await;
    assert_eq!(with.page_info.total, Some(4));
}

// =============================================================================
// Normalization Tests
// =============================================================================

/// Negative offsets and non-positive page sizes fall back to defaults.
#[test]
fn test_out_of_range_inputs_normalize() {
    let window = PaginationWindow::new(-3, 0, false);
    assert_eq!(window.offset(), 0);
    assert_eq!(window.page_size(), DEFAULT_PAGE_SIZE);

    let window = PaginationWindow::new(2, -10, false);
    assert_eq!(window.page_size(), DEFAULT_PAGE_SIZE);
}

/// Query-string parameters parse defensively.
#[test]
fn test_query_params_parse_defensively() {
    let params: PaginationParams =
        serde_json::from_value(json!({"offset": "-1", "pageSize": "ten", "includeTotal": "TRUE"}))
            .unwrap();
    let window = params.window();

    assert_eq!(window.offset(), 0);
    assert_eq!(window.page_size(), DEFAULT_PAGE_SIZE);
    assert!(!window.include_total());
}

/// Metadata serializes in camelCase and omits an absent total.
#[test]
fn test_metadata_wire_format() {
    let window = PaginationWindow::new(0, 2, false);
    let meta = PaginationMetadata::resolve(&window, &mut vec![1, 2, 3], None);

    let json = serde_json::to_value(&meta).unwrap();
    assert_eq!(
        json,
        json!({"offset": 0, "pageSize": 2, "count": 2, "hasMore": true})
    );
}

// =============================================================================
// Domain Listing Tests
// =============================================================================

/// Walking the user list page by page visits every user once.
#[tokio::test]
async fn test_walk_all_user_pages() {
    let users = UserService::new(MemoryStore::new());
    let ctx = RequestContext::generated();
    for i in 0..7 {
        users
            .create_user(
                &ctx,
                UserCreateInput {
                    email: format!("walker{}@example.com", i),
                    age: 20,
                },
            )
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = users
            .list_users(&ctx, PaginationWindow::new(offset, 3, false))
            .await
            .unwrap();
        seen.extend(page.data.iter().map(|u| u.id));
        if !page.page_info.has_more {
            break;
        }
        offset += page.page_info.count as i64;
    }

    assert_eq!(seen, (1..=7).collect::<Vec<_>>());
}
