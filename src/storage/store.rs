//! Accumulation store
//!
//! Holds every resolved record keyed by item name. Upserts land in memory
//! and are marked dirty; [`AccumulationStore::persist`] writes the dirty
//! records in one transaction. A crash between persists therefore loses
//! only the upserts made since the last persist, and a later
//! [`AccumulationStore::load`] sees exactly what was last persisted.

use crate::item::BookRecord;
use crate::storage::{RunStatus, SqliteStorage, Storage, StorageResult};
use crate::ScoutError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub struct AccumulationStore {
    backend: SqliteStorage,
    records: BTreeMap<String, BookRecord>,
    dirty: BTreeSet<String>,
}

impl AccumulationStore {
    /// Opens the store at `path`, loading whatever was persisted there
    ///
    /// A path that does not exist yet yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ScoutError> {
        let existed = path.exists();
        let backend = SqliteStorage::new(path)?;
        let store = Self::with_backend(backend)?;

        if existed {
            tracing::info!("Loaded {} records from {}", store.len(), path.display());
        } else {
            tracing::info!("No store at {}; starting empty", path.display());
        }
        Ok(store)
    }

    /// A store backed by an in-memory database
    pub fn in_memory() -> Result<Self, ScoutError> {
        Self::with_backend(SqliteStorage::new_in_memory()?)
    }

    fn with_backend(backend: SqliteStorage) -> Result<Self, ScoutError> {
        let records = backend
            .load_items()?
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        Ok(Self {
            backend,
            records,
            dirty: BTreeSet::new(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// True when some record was resolved from this item URL
    pub fn contains_url(&self, url: &str) -> bool {
        self.records.values().any(|record| record.url == url)
    }

    pub fn get(&self, name: &str) -> Option<&BookRecord> {
        self.records.get(name)
    }

    /// All records, ordered by name
    pub fn get_all(&self) -> impl Iterator<Item = &BookRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of upserts not yet persisted
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Inserts or replaces the record with this name
    ///
    /// A record whose URL differs from the one it replaces is logged as a
    /// name collision; the newer record wins.
    pub fn upsert(&mut self, record: BookRecord) {
        if let Some(previous) = self.records.get(&record.name) {
            if previous.url != record.url {
                tracing::warn!(
                    "Name collision for '{}': {} replaced by {}",
                    record.name,
                    previous.url,
                    record.url
                );
            }
        }

        self.dirty.insert(record.name.clone());
        self.records.insert(record.name.clone(), record);
    }

    /// Writes every pending upsert in a single transaction
    pub fn persist(&mut self) -> StorageResult<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let pending: Vec<&BookRecord> = self
            .dirty
            .iter()
            .filter_map(|name| self.records.get(name))
            .collect();
        self.backend.save_items(&pending)?;

        tracing::debug!("Persisted {} records", pending.len());
        self.dirty.clear();
        Ok(())
    }

    /// Drops every record, in memory and on disk
    pub fn clear(&mut self) -> StorageResult<()> {
        self.backend.clear_items()?;
        self.records.clear();
        self.dirty.clear();
        Ok(())
    }

    pub fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.backend.create_run(config_hash)
    }

    pub fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        resolved: u64,
        dropped: u64,
    ) -> StorageResult<()> {
        self.backend.finish_run(run_id, status, resolved, dropped)
    }

    /// The backend, for statistics queries
    pub fn backend(&self) -> &SqliteStorage {
        &self.backend
    }
}
