//! Storage traits and error types

use crate::item::BookRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record '{name}': {message}")]
    Corrupt { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The accumulation store keeps its working set in memory and uses a backend
/// only to load it at startup and to write dirty records back.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        resolved: u64,
        dropped: u64,
    ) -> StorageResult<()>;

    /// Counts the runs recorded so far
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Item Management =====

    /// Loads every persisted record
    fn load_items(&self) -> StorageResult<Vec<BookRecord>>;

    /// Writes records in a single transaction, replacing rows with the same name
    ///
    /// Either all records are written or none are.
    fn save_items(&mut self, records: &[&BookRecord]) -> StorageResult<()>;

    /// Deletes every item
    fn clear_items(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    fn count_items(&self) -> StorageResult<u64>;

    /// Counts items with an editions link
    fn count_items_with_editions(&self) -> StorageResult<u64>;

    /// Counts items in stock at each source: (bookchor, bookish santa, shbi)
    fn count_available_by_source(&self) -> StorageResult<(u64, u64, u64)>;

    /// Counts items in stock at one source or more
    fn count_available_anywhere(&self) -> StorageResult<u64>;
}
