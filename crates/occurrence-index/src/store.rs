//! Storage seams: where parent records come from and where index rows live.
//!
//! Both traits are blocking. The in-memory implementations back the tests and
//! small embedders; a database-backed store implements the same traits.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{IndexError, Result};
use crate::model::{IndexRow, SourceRecord, StorageRow};

/// Read access to parent records.
pub trait SourceRecordStore: Send + Sync {
    /// The record `(table, uid)`, or `None` when it does not exist.
    fn get(&self, table: &str, uid: u64) -> Result<Option<SourceRecord>>;
}

/// Persisted index rows.
pub trait IndexRowStore: Send + Sync {
    /// Rows whose slug starts with `prefix`, in a stable store-defined order.
    fn find_by_slug_prefix(&self, prefix: &str) -> Result<Vec<IndexRow>>;

    /// First row whose normalized columns equal every entry of `fields`.
    fn find_by_fields(&self, fields: &StorageRow) -> Result<Option<IndexRow>>;

    /// Drop all rows owned by `(table, uid)` and persist `rows` in their place.
    ///
    /// Returns the identifiers assigned to `rows`, in order.
    fn replace_rows(&self, table: &str, uid: u64, rows: Vec<IndexRow>) -> Result<Vec<u64>>;
}

fn poisoned<T>(_: T) -> IndexError {
    IndexError::Storage("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<(String, u64), SourceRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| ((r.table.clone(), r.uid), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Insert or overwrite a record.
    pub fn insert(&self, record: SourceRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert((record.table.clone(), record.uid), record);
        Ok(())
    }
}

impl SourceRecordStore for MemoryRecordStore {
    fn get(&self, table: &str, uid: u64) -> Result<Option<SourceRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&(table.to_string(), uid)).cloned())
    }
}

#[derive(Debug, Default)]
struct MemoryIndex {
    rows: BTreeMap<u64, IndexRow>,
    last_uid: u64,
}

impl MemoryIndex {
    fn insert(&mut self, mut row: IndexRow) -> u64 {
        self.last_uid += 1;
        let uid = self.last_uid;
        row.uid = Some(uid);
        self.rows.insert(uid, row);
        uid
    }
}

/// Index rows held in memory. Identifiers increase monotonically and are never
/// reused, so deleting a row leaves a gap. Lookups return rows in identifier order.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    inner: RwLock<MemoryIndex>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryIndex>> {
        self.inner.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryIndex>> {
        self.inner.write().map_err(poisoned)
    }

    /// Persist a single row and return its identifier.
    pub fn insert(&self, row: IndexRow) -> Result<u64> {
        Ok(self.write()?.insert(row))
    }

    /// Delete a row by identifier. Returns whether it existed.
    pub fn remove(&self, uid: u64) -> Result<bool> {
        Ok(self.write()?.rows.remove(&uid).is_some())
    }

    /// Snapshot of every persisted row, in identifier order.
    pub fn rows(&self) -> Result<Vec<IndexRow>> {
        Ok(self.read()?.rows.values().cloned().collect())
    }
}

impl IndexRowStore for MemoryIndexStore {
    fn find_by_slug_prefix(&self, prefix: &str) -> Result<Vec<IndexRow>> {
        Ok(self
            .read()?
            .rows
            .values()
            .filter(|row| row.slug.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn find_by_fields(&self, fields: &StorageRow) -> Result<Option<IndexRow>> {
        Ok(self
            .read()?
            .rows
            .values()
            .find(|row| {
                let stored = row.to_storage();
                fields
                    .iter()
                    .all(|(name, value)| stored.get(name) == Some(value))
            })
            .cloned())
    }

    fn replace_rows(&self, table: &str, uid: u64, rows: Vec<IndexRow>) -> Result<Vec<u64>> {
        let mut index = self.write()?;
        index
            .rows
            .retain(|_, row| !(row.foreign_table == table && row.foreign_uid == uid));
        Ok(rows.into_iter().map(|row| index.insert(row)).collect())
    }
}
