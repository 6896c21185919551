//! In-memory transactable store
//!
//! Rows keep a committed image and at most one pending image owned by a
//! live transaction. Readers see committed images plus their own pending
//! images. Writers that meet another transaction's pending image affect zero
//! rows (NOWAIT), which the optimistic lock reports as a conflict.
//!
//! Connections are modelled by a semaphore: a transaction holds one permit
//! from `begin` until it is committed, rolled back or dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::errors::{StoreError, StoreResult};
use super::{BoxFuture, Fields, Predicate, Query, Record, RecordId, Store, Transaction, TxId};

/// Pool settings for [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum concurrently open transactions
    pub max_connections: usize,
    /// How long `begin` waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Terminal-operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub commit_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    commit_failures: AtomicU64,
}

#[derive(Debug, Default)]
struct Row {
    committed: Option<Fields>,
    pending: Option<(TxId, Fields)>,
}

impl Row {
    fn visible_to(&self, tx: TxId) -> Option<&Fields> {
        match &self.pending {
            Some((owner, image)) if *owner == tx => Some(image),
            _ => self.committed.as_ref(),
        }
    }

    fn locked_by_other(&self, tx: TxId) -> bool {
        matches!(&self.pending, Some((owner, _)) if *owner != tx)
    }
}

#[derive(Debug, Default)]
struct Table {
    last_id: RecordId,
    rows: BTreeMap<RecordId, Row>,
}

type Tables = HashMap<&'static str, Table>;

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    pool: Arc<Semaphore>,
    acquire_timeout: Duration,
    next_tx: AtomicU64,
    counters: Counters,
    fail_commits: AtomicBool,
}

impl Shared {
    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    /// Promote or discard the pending images `tx` owns
    fn release(&self, tx: TxId, touched: &[(&'static str, RecordId)], promote: bool) -> StoreResult<()> {
        let mut tables = self.lock()?;

        for (table, id) in touched {
            let Some(table) = tables.get_mut(table) else {
                continue;
            };
            let Some(row) = table.rows.get_mut(id) else {
                continue;
            };

            match row.pending.take() {
                Some((owner, image)) if owner == tx => {
                    if promote {
                        row.committed = Some(image);
                    }
                }
                other => row.pending = other,
            }

            if row.committed.is_none() && row.pending.is_none() {
                table.rows.remove(id);
            }
        }

        Ok(())
    }
}

/// In-memory [`Store`] with pooled connections
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Create a store with default pool settings
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create a store with custom pool settings
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(HashMap::new()),
                pool: Arc::new(Semaphore::new(config.max_connections.max(1))),
                acquire_timeout: config.acquire_timeout,
                next_tx: AtomicU64::new(1),
                counters: Counters::default(),
                fail_commits: AtomicBool::new(false),
            }),
        }
    }

    /// Terminal-operation counters since creation
    pub fn stats(&self) -> StoreStats {
        let c = &self.shared.counters;
        StoreStats {
            begun: c.begun.load(Ordering::Relaxed),
            committed: c.committed.load(Ordering::Relaxed),
            rolled_back: c.rolled_back.load(Ordering::Relaxed),
            commit_failures: c.commit_failures.load(Ordering::Relaxed),
        }
    }

    /// Fault injection: while set, every commit fails and discards its writes
    pub fn set_commit_fault(&self, enabled: bool) {
        self.shared.fail_commits.store(enabled, Ordering::SeqCst);
    }

    /// Free connection slots
    pub fn available_connections(&self) -> usize {
        self.shared.pool.available_permits()
    }

    /// Stop handing out connections; open transactions finish normally
    pub fn close(&self) {
        self.shared.pool.close();
    }

    async fn open(&self) -> StoreResult<MemoryTx> {
        let acquire = self.shared.pool.clone().acquire_owned();
        let permit = tokio::time::timeout(self.shared.acquire_timeout, acquire)
            .await
            .map_err(|_| StoreError::PoolTimeout(self.shared.acquire_timeout))?
            .map_err(|_| StoreError::Closed)?;

        let id = self.shared.next_tx.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.begun.fetch_add(1, Ordering::Relaxed);

        Ok(MemoryTx {
            id,
            shared: Arc::clone(&self.shared),
            touched: Vec::new(),
            finished: false,
            _permit: permit,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    type Tx = MemoryTx;

    fn begin(&self) -> BoxFuture<'_, StoreResult<MemoryTx>> {
        Box::pin(self.open())
    }
}

/// Transaction on a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTx {
    id: TxId,
    shared: Arc<Shared>,
    touched: Vec<(&'static str, RecordId)>,
    finished: bool,
    _permit: OwnedSemaphorePermit,
}

impl MemoryTx {
    fn touch(&mut self, table: &'static str, id: RecordId) {
        if !self.touched.contains(&(table, id)) {
            self.touched.push((table, id));
        }
    }

    fn find_now(&self, table: &'static str, id: RecordId) -> StoreResult<Option<Record>> {
        let tables = self.shared.lock()?;
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.get(&id))
            .and_then(|row| row.visible_to(self.id))
            .map(|fields| Record {
                id,
                fields: fields.clone(),
            }))
    }

    fn insert_now(&mut self, table: &'static str, mut fields: Fields) -> StoreResult<Record> {
        fields.remove("id");

        let id = {
            let mut tables = self.shared.lock()?;
            let table = tables.entry(table).or_default();
            table.last_id += 1;
            let id = table.last_id;
            table.rows.insert(
                id,
                Row {
                    committed: None,
                    pending: Some((self.id, fields.clone())),
                },
            );
            id
        };

        self.touch(table, id);
        Ok(Record { id, fields })
    }

    fn update_now(&mut self, table: &'static str, predicate: Predicate, values: Fields) -> StoreResult<u64> {
        let id = predicate.id;

        {
            let mut tables = self.shared.lock()?;
            let Some(row) = tables.get_mut(table).and_then(|t| t.rows.get_mut(&id)) else {
                return Ok(0);
            };

            if row.locked_by_other(self.id) {
                return Ok(0);
            }

            let Some(current) = row.visible_to(self.id) else {
                return Ok(0);
            };

            if !predicate.matches(id, current) {
                return Ok(0);
            }

            let mut image = current.clone();
            for (column, value) in values {
                if column != "id" {
                    image.insert(column, value);
                }
            }
            row.pending = Some((self.id, image));
        }

        self.touch(table, id);
        Ok(1)
    }

    fn visible_rows(&self, table: &'static str, query: &Query) -> StoreResult<Vec<Record>> {
        let tables = self.shared.lock()?;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };

        Ok(table
            .rows
            .iter()
            .filter_map(|(id, row)| row.visible_to(self.id).map(|f| (*id, f)))
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| Record {
                id,
                fields: fields.clone(),
            })
            .collect())
    }

    fn select_now(&self, table: &'static str, query: Query) -> StoreResult<Vec<Record>> {
        let rows = self.visible_rows(table, &query)?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(query.offset).take(limit).collect())
    }

    fn finish(&mut self, promote: bool) -> StoreResult<()> {
        self.finished = true;
        let touched = std::mem::take(&mut self.touched);
        self.shared.release(self.id, &touched, promote)
    }
}

impl Transaction for MemoryTx {
    fn id(&self) -> TxId {
        self.id
    }

    fn find(&mut self, table: &'static str, id: RecordId) -> BoxFuture<'_, StoreResult<Option<Record>>> {
        Box::pin(std::future::ready(self.find_now(table, id)))
    }

    fn insert(&mut self, table: &'static str, fields: Fields) -> BoxFuture<'_, StoreResult<Record>> {
        Box::pin(std::future::ready(self.insert_now(table, fields)))
    }

    fn update(
        &mut self,
        table: &'static str,
        predicate: Predicate,
        values: Fields,
    ) -> BoxFuture<'_, StoreResult<u64>> {
        Box::pin(std::future::ready(self.update_now(table, predicate, values)))
    }

    fn select(&mut self, table: &'static str, query: Query) -> BoxFuture<'_, StoreResult<Vec<Record>>> {
        Box::pin(std::future::ready(self.select_now(table, query)))
    }

    fn count(&mut self, table: &'static str, query: Query) -> BoxFuture<'_, StoreResult<u64>> {
        let counted = self
            .visible_rows(table, &query)
            .map(|rows| rows.len() as u64);
        Box::pin(std::future::ready(counted))
    }

    fn commit(mut self) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            let shared = Arc::clone(&self.shared);
            let counters = &shared.counters;

            if shared.fail_commits.load(Ordering::SeqCst) {
                self.finish(false)?;
                counters.commit_failures.fetch_add(1, Ordering::Relaxed);
                return Err(StoreError::CommitFailed(format!(
                    "transaction {} refused by fault plan",
                    self.id
                )));
            }

            self.finish(true)?;
            counters.committed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn rollback(mut self) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            self.finish(false)
                .map_err(|e| StoreError::RollbackFailed(e.to_string()))?;
            self.shared
                .counters
                .rolled_back
                .fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish(false);
            self.shared
                .counters
                .rolled_back
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_committed_insert_is_visible() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let record = tx.insert("users", fields(json!({"email": "a@b.co"}))).await.unwrap();
        assert_eq!(record.id, 1);
        tx.commit().await.unwrap();

        let mut reader = store.begin().await.unwrap();
        let found = reader.find("users", 1).await.unwrap().unwrap();
        assert_eq!(found.fields["email"], "a@b.co");
        reader.rollback().await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.begun, 2);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.rolled_back, 1);
    }

    #[tokio::test]
    async fn test_pending_insert_is_private() {
        let store = MemoryStore::new();

        let mut writer = store.begin().await.unwrap();
        writer.insert("users", fields(json!({"email": "a@b.co"}))).await.unwrap();

        let mut reader = store.begin().await.unwrap();
        assert!(reader.find("users", 1).await.unwrap().is_none());
        assert_eq!(reader.count("users", Query::all()).await.unwrap(), 0);

        writer.rollback().await.unwrap();
        assert!(reader.find("users", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_against_foreign_pending_row_affects_nothing() {
        let store = MemoryStore::new();

        let mut setup = store.begin().await.unwrap();
        setup.insert("users", fields(json!({"version": 1}))).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let predicate = Predicate::by_id(1).and_eq("version", 1);
        let values = fields(json!({"version": 2}));

        assert_eq!(first.update("users", predicate.clone(), values.clone()).await.unwrap(), 1);
        assert_eq!(second.update("users", predicate, values).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert("users", fields(json!({"email": "x@y.co"}))).await.unwrap();
        }

        let mut reader = store.begin().await.unwrap();
        assert_eq!(reader.count("users", Query::all()).await.unwrap(), 0);
        assert_eq!(store.stats().rolled_back, 1);
    }

    #[tokio::test]
    async fn test_commit_fault_discards_writes() {
        let store = MemoryStore::new();
        store.set_commit_fault(true);

        let mut tx = store.begin().await.unwrap();
        tx.insert("users", fields(json!({"email": "x@y.co"}))).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::CommitFailed(_))));

        store.set_commit_fault(false);
        let mut reader = store.begin().await.unwrap();
        assert_eq!(reader.count("users", Query::all()).await.unwrap(), 0);
        assert_eq!(store.stats().commit_failures, 1);
    }

    #[tokio::test]
    async fn test_pool_timeout() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_millis(20),
        });

        let _held = store.begin().await.unwrap();
        assert!(matches!(store.begin().await, Err(StoreError::PoolTimeout(_))));
    }

    #[tokio::test]
    async fn test_select_window_in_id_order() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for age in 0..5 {
            tx.insert("users", fields(json!({"age": age}))).await.unwrap();
        }

        let rows = tx.select("users", Query::all().window(1, 2)).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
