//! CatalogStore: redb-backed persistence for update records.
//!
//! Rows live in a single `updates` table keyed by `(identifier, revision)`.
//! Writes run in redb write transactions (serialized by redb), and every
//! query is evaluated inside one read transaction, so a view is always a
//! consistent snapshot. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::filter::Filter;
use crate::tables::*;
use crate::types::*;

/// Wrap a backend error into the given `CatalogError` variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| CatalogError::$variant(e.to_string())
    };
}

/// Update catalog backed by redb. Clones share one database.
#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<Database>,
}

impl CatalogStore {
    /// Open the catalog file at `path`, creating it if missing.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(Arc::new(db))?;
        debug!(?path, "catalog opened");
        Ok(store)
    }

    /// A catalog that lives only as long as the process.
    pub fn open_in_memory() -> CatalogResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(map_err!(Open))?;
        let store = Self::from_database(Arc::new(db))?;
        debug!("in-memory catalog opened");
        Ok(store)
    }

    /// Use an already opened database, creating the catalog tables if they
    /// are missing. Other tables in the same database are left alone.
    pub fn from_database(db: Arc<Database>) -> CatalogResult<Self> {
        let txn = db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(UPDATES).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(Self { db })
    }

    // ── Records ────────────────────────────────────────────────────

    /// Insert or replace a record.
    ///
    /// Returns `false` without writing when the stored row already equals
    /// the (normalized) record.
    pub fn add(&self, record: &Record) -> CatalogResult<bool> {
        if record.identifier.is_empty() {
            return Err(CatalogError::InvalidRecord("empty identifier".to_string()));
        }
        let key = (record.identifier.as_str(), record.revision);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let changed;
        {
            let mut table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
            let existing = read_row(&table, key)?;
            let row = normalize(record, existing.as_ref());
            changed = existing.as_ref() != Some(&row);
            if changed {
                let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
                table
                    .insert(key, value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        if changed {
            txn.commit().map_err(map_err!(Transaction))?;
        } else {
            txn.abort().map_err(map_err!(Transaction))?;
        }
        debug!(key = %record.key(), changed, "record stored");
        Ok(changed)
    }

    /// Delete a record by key. Returns true if it existed.
    pub fn remove(&self, key: &RecordKey) -> CatalogResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
            existed = table
                .remove((key.identifier.as_str(), key.revision))
                .map_err(map_err!(Write))?
                .is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "record deleted");
        Ok(existed)
    }

    /// Get a record by key.
    pub fn get(&self, key: &RecordKey) -> CatalogResult<Option<Record>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
        read_row(&table, (key.identifier.as_str(), key.revision))
    }

    /// Evaluate a filter against one snapshot of the catalog.
    pub fn query(&self, filter: Filter) -> CatalogResult<Vec<Record>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
        let mut rows = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: Record =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            rows.push(record);
        }
        Ok(filter.apply(rows))
    }

    /// Total number of stored rows, superseded history included.
    pub fn len(&self) -> CatalogResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.len()? == 0)
    }

    // ── Bookkeeping ────────────────────────────────────────────────

    /// Mark a record as installed. Returns true if the row changed.
    pub fn mark_installed(&self, key: &RecordKey) -> CatalogResult<bool> {
        self.modify(key, |row| {
            row.installed = true;
            row.state = State::Installed;
            row.progress = 100;
        })
    }

    /// Move a record to a new lifecycle state.
    pub fn set_state(&self, key: &RecordKey, state: State) -> CatalogResult<bool> {
        self.modify(key, |row| row.state = state)
    }

    /// Record download/install progress (clamped to 100).
    pub fn set_progress(&self, key: &RecordKey, progress: u8) -> CatalogResult<bool> {
        self.modify(key, |row| row.progress = progress.min(100))
    }

    /// Attach an error message and mark the record as failed.
    pub fn set_error(&self, key: &RecordKey, error: &str) -> CatalogResult<bool> {
        self.modify(key, |row| {
            row.error = error.to_string();
            row.state = State::Failed;
        })
    }

    /// Read-modify-write a full row in one write transaction. Absent rows
    /// and edits that leave the row unchanged are no-ops.
    fn modify(&self, key: &RecordKey, edit: impl FnOnce(&mut Record)) -> CatalogResult<bool> {
        let raw_key = (key.identifier.as_str(), key.revision);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut changed = false;
        {
            let mut table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
            if let Some(existing) = read_row(&table, raw_key)? {
                let mut row = existing.clone();
                edit(&mut row);
                if row != existing {
                    row.updated_at = now_secs().max(existing.updated_at);
                    let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
                    table
                        .insert(raw_key, value.as_slice())
                        .map_err(map_err!(Write))?;
                    changed = true;
                }
            }
        }
        if changed {
            txn.commit().map_err(map_err!(Transaction))?;
        } else {
            txn.abort().map_err(map_err!(Transaction))?;
        }
        debug!(%key, changed, "record modified");
        Ok(changed)
    }

    /// Delete installed records last updated before `before`. Pending
    /// records are never pruned. Returns the number deleted.
    pub fn prune_installed(&self, before: Timestamp) -> CatalogResult<u32> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut table = txn.open_table(UPDATES).map_err(map_err!(Table))?;
            let mut stale: Vec<(String, u32)> = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let record: Record =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if record.is_installed() && record.updated_at < before {
                    let (identifier, revision) = key.value();
                    stale.push((identifier.to_string(), revision));
                }
            }
            count = stale.len() as u32;
            for (identifier, revision) in &stale {
                table
                    .remove((identifier.as_str(), *revision))
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(before, count, "installed records pruned");
        Ok(count)
    }

    /// Timestamp of the last successful metadata check, if any.
    pub fn last_check(&self) -> CatalogResult<Option<Timestamp>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(META).map_err(map_err!(Table))?;
        let value = table
            .get(LAST_CHECK_KEY)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value());
        Ok(value)
    }

    pub fn set_last_check(&self, at: Timestamp) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(META).map_err(map_err!(Table))?;
            table.insert(LAST_CHECK_KEY, at).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

fn read_row<T>(table: &T, key: (&str, u32)) -> CatalogResult<Option<Record>>
where
    T: ReadableTable<(&'static str, u32), &'static [u8]>,
{
    match table.get(key).map_err(map_err!(Read))? {
        Some(guard) => {
            let record: Record =
                serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Correct field values at the store boundary before comparing or writing.
fn normalize(record: &Record, existing: Option<&Record>) -> Record {
    let mut row = record.clone();
    row.progress = row.progress.min(100);
    if row.created_at == 0 {
        row.created_at = existing.map_or_else(now_secs, |e| e.created_at);
    }
    if row.updated_at == 0 {
        row.updated_at = existing.map_or(row.created_at, |e| e.updated_at);
    }
    row
}
