//! Order reads and writes inside a caller-owned transaction

use chrono::{DateTime, Utc};

use crate::occ::{self, encode};
use crate::occ::Versioned;
use crate::store::{Query, RecordId, StoreResult, Transaction};

use super::model::{NewOrder, Order};

/// Orders of one user, ordered by id
pub async fn find_orders_by_user_id<Tx: Transaction>(
    tx: &mut Tx,
    user_id: RecordId,
) -> StoreResult<Vec<Order>> {
    occ::select::<Order, Tx>(tx, Query::all().filter_eq("userId", user_id)).await
}

/// Orders of any of `user_ids`, ordered by id
pub async fn find_orders_by_user_ids<Tx: Transaction>(
    tx: &mut Tx,
    user_ids: &[RecordId],
) -> StoreResult<Vec<Order>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    occ::select::<Order, Tx>(tx, Query::all().filter_in("userId", user_ids.iter().copied())).await
}

pub async fn count_orders<Tx: Transaction>(tx: &mut Tx) -> StoreResult<u64> {
    tx.count(Order::TABLE, Query::all()).await
}

pub async fn insert_order<Tx: Transaction>(
    tx: &mut Tx,
    user_id: RecordId,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> StoreResult<Order> {
    let fields = encode(&NewOrder {
        user_id,
        amount_cents,
        created_at: now,
        updated_at: now,
    })?;
    occ::insert::<Order, Tx>(tx, fields).await
}
