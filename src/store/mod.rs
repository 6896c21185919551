//! # Transactable Store
//!
//! The capability surface the transaction scope and the optimistic lock
//! consume. A [`Store`] hands out [`Transaction`]s; a transaction is owned by
//! exactly one unit of work and ends with exactly one of `commit` or
//! `rollback`.
//!
//! Implementations must roll back a transaction that is dropped without
//! reaching either terminal operation.

mod errors;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryStoreConfig, MemoryTx, StoreStats};

use serde_json::{Map, Value};

/// Boxed future returned by store operations
pub use futures_util::future::BoxFuture;

/// Primary key of a stored row
pub type RecordId = i64;

/// Column values of a row, keyed by column name
pub type Fields = Map<String, Value>;

/// Transaction identity, unique per store
pub type TxId = u64;

/// A row as seen by one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: Fields,
}

/// Row predicate for conditional updates: `id = ? AND col = ? ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub id: RecordId,
    pub equals: Vec<(String, Value)>,
}

impl Predicate {
    /// Match a single row by primary key
    pub fn by_id(id: RecordId) -> Self {
        Self {
            id,
            equals: Vec::new(),
        }
    }

    /// Additionally require `column = value`
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    /// Evaluate against a row image
    pub fn matches(&self, id: RecordId, fields: &Fields) -> bool {
        self.id == id && matches_all(&self.equals, fields)
    }
}

/// Read query over one table, ordered by primary key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub equals: Vec<(String, Value)>,
    pub any_of: Vec<(String, Vec<Value>)>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    /// Query every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `column = value`
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    /// Require `column IN (values)`; an empty list matches nothing
    pub fn filter_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.any_of
            .push((column.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Skip `offset` rows and return at most `limit`
    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Whether a row image satisfies the filter part of this query
    pub fn matches(&self, fields: &Fields) -> bool {
        matches_all(&self.equals, fields)
            && self.any_of.iter().all(|(column, values)| {
                fields
                    .get(column)
                    .map_or(false, |value| values.contains(value))
            })
    }
}

fn matches_all(equals: &[(String, Value)], fields: &Fields) -> bool {
    equals
        .iter()
        .all(|(column, value)| fields.get(column) == Some(value))
}

/// A unit of storage work bound to one connection
pub trait Transaction: Send {
    /// Identity of this transaction
    fn id(&self) -> TxId;

    /// Read one row by primary key
    fn find(&mut self, table: &'static str, id: RecordId) -> BoxFuture<'_, StoreResult<Option<Record>>>;

    /// Insert a row, assigning its primary key
    fn insert(&mut self, table: &'static str, fields: Fields) -> BoxFuture<'_, StoreResult<Record>>;

    /// Conditional update; returns the number of affected rows
    fn update(
        &mut self,
        table: &'static str,
        predicate: Predicate,
        values: Fields,
    ) -> BoxFuture<'_, StoreResult<u64>>;

    /// Read rows matching `query`
    fn select(&mut self, table: &'static str, query: Query) -> BoxFuture<'_, StoreResult<Vec<Record>>>;

    /// Count rows matching the filter part of `query`
    fn count(&mut self, table: &'static str, query: Query) -> BoxFuture<'_, StoreResult<u64>>;

    /// Make this transaction's writes durable and visible
    fn commit(self) -> BoxFuture<'static, StoreResult<()>>
    where
        Self: Sized;

    /// Discard this transaction's writes
    fn rollback(self) -> BoxFuture<'static, StoreResult<()>>
    where
        Self: Sized;
}

/// Source of transactions
pub trait Store: Send + Sync {
    type Tx: Transaction + 'static;

    /// Check out a connection and open a transaction on it
    fn begin(&self) -> BoxFuture<'_, StoreResult<Self::Tx>>;
}
