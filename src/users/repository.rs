//! User reads and writes inside a caller-owned transaction

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::occ::{self, encode, update_versioned_checked, Mutation, Versioned};
use crate::pagination::{Page, PaginationWindow};
use crate::store::{Query, RecordId, Transaction};

use super::errors::{UserError, UserResult};
use super::model::{NewUser, User, UserCreateInput, UserUpdateInput};

pub async fn find_user<Tx: Transaction>(tx: &mut Tx, id: RecordId) -> UserResult<User> {
    occ::find::<User, Tx>(tx, id)
        .await?
        .ok_or(UserError::NotFound { id })
}

/// One page of users ordered by id, fetched with a HasMore probe
pub async fn find_users<Tx: Transaction>(
    tx: &mut Tx,
    window: &PaginationWindow,
) -> UserResult<Page<User>> {
    let rows = occ::select::<User, Tx>(tx, window.probe_query()).await?;

    let total = if window.include_total() {
        Some(tx.count(User::TABLE, Query::all()).await?)
    } else {
        None
    };

    Ok(Page::from_probe(window, rows, total))
}

/// Ids of every user, ascending
pub async fn all_user_ids<Tx: Transaction>(tx: &mut Tx) -> UserResult<Vec<RecordId>> {
    let records = tx.select(User::TABLE, Query::all()).await?;
    Ok(records.into_iter().map(|record| record.id).collect())
}

pub async fn email_exists<Tx: Transaction>(tx: &mut Tx, email: &str) -> UserResult<bool> {
    let matching = tx
        .count(User::TABLE, Query::all().filter_eq("email", email))
        .await?;
    Ok(matching > 0)
}

pub async fn insert_user<Tx: Transaction>(
    tx: &mut Tx,
    input: &UserCreateInput,
    now: DateTime<Utc>,
) -> UserResult<User> {
    let fields = encode(&NewUser {
        email: &input.email,
        age: input.age,
        created_at: now,
        updated_at: now,
    })?;
    Ok(occ::insert::<User, Tx>(tx, fields).await?)
}

/// Versioned update; a stale `input.version` is a conflict
pub async fn update_user<Tx: Transaction>(
    tx: &mut Tx,
    id: RecordId,
    input: &UserUpdateInput,
    now: DateTime<Utc>,
) -> UserResult<User> {
    let mutation = Mutation::from_patch(input)?.set("updatedAt", json!(now));
    Ok(update_versioned_checked::<User, Tx>(tx, id, input.version, mutation).await?)
}
