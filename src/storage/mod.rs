//! Storage module for persisting scout results
//!
//! This module handles:
//! - SQLite database initialization and schema management
//! - Item record persistence, keyed by item name
//! - Run tracking
//! - The in-memory [`AccumulationStore`] layered on top

mod schema;
mod sqlite;
mod store;
mod traits;

pub use sqlite::SqliteStorage;
pub use store::AccumulationStore;
pub use traits::{Storage, StorageError, StorageResult};

/// Represents a scout run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub resolved: u64,
    pub dropped: u64,
}

/// Status of a scout run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,

    /// Every dispatched item resolved
    Completed,

    /// Some items were dropped after the retry budget ran out
    Partial,

    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
