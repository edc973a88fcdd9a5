//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::item::{Availability, BookRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::ScoutError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const KIND_ISBN: &str = "isbn13";
const KIND_BOOKCHOR: &str = "bookchor";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, ScoutError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ScoutError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        resolved: row.get::<_, i64>(5)? as u64,
        dropped: row.get::<_, i64>(6)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, resolved, dropped
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        resolved: u64,
        dropped: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, resolved = ?3, dropped = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                resolved as i64,
                dropped as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    // ===== Item Management =====

    fn load_items(&self) -> StorageResult<Vec<BookRecord>> {
        let mut identifiers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut bookchor: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let mut stmt = self.conn.prepare(
            "SELECT item_name, kind, identifier FROM item_identifiers
             ORDER BY item_name, position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (name, kind, identifier) = row?;
            match kind.as_str() {
                KIND_ISBN => {
                    identifiers.entry(name).or_default().insert(identifier);
                }
                KIND_BOOKCHOR => bookchor.entry(name).or_default().push(identifier),
                other => {
                    return Err(StorageError::Corrupt {
                        name,
                        message: format!("unknown identifier kind '{}'", other),
                    })
                }
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT name, url, editions_url, author, series, bookish_santa, shbi, checked_at
             FROM items ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, url, editions_url, author, series, bookish_santa, shbi, checked_at) = row?;
            let checked_at = DateTime::parse_from_rfc3339(&checked_at)
                .map_err(|e| StorageError::Corrupt {
                    name: name.clone(),
                    message: format!("bad checked_at '{}': {}", checked_at, e),
                })?
                .with_timezone(&Utc);

            records.push(BookRecord {
                identifiers: identifiers.remove(&name).unwrap_or_default(),
                availability: Availability {
                    bookchor: bookchor.remove(&name).unwrap_or_default(),
                    bookish_santa,
                    shbi,
                },
                name,
                url,
                editions_url,
                author,
                series,
                checked_at,
            });
        }

        Ok(records)
    }

    fn save_items(&mut self, records: &[&BookRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        {
            let mut upsert = tx.prepare(
                "INSERT INTO items
                 (name, url, editions_url, author, series, bookish_santa, shbi, checked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(name) DO UPDATE SET
                    url = excluded.url,
                    editions_url = excluded.editions_url,
                    author = excluded.author,
                    series = excluded.series,
                    bookish_santa = excluded.bookish_santa,
                    shbi = excluded.shbi,
                    checked_at = excluded.checked_at",
            )?;
            let mut clear_identifiers =
                tx.prepare("DELETE FROM item_identifiers WHERE item_name = ?1")?;
            let mut insert_identifier = tx.prepare(
                "INSERT INTO item_identifiers (item_name, kind, identifier, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for record in records {
                upsert.execute(params![
                    record.name,
                    record.url,
                    record.editions_url,
                    record.author,
                    record.series,
                    record.availability.bookish_santa,
                    record.availability.shbi,
                    record.checked_at.to_rfc3339(),
                ])?;

                clear_identifiers.execute(params![record.name])?;
                for (position, isbn) in record.identifiers.iter().enumerate() {
                    insert_identifier.execute(params![
                        record.name,
                        KIND_ISBN,
                        isbn,
                        position as i64
                    ])?;
                }
                for (position, isbn) in record.availability.bookchor.iter().enumerate() {
                    insert_identifier.execute(params![
                        record.name,
                        KIND_BOOKCHOR,
                        isbn,
                        position as i64
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn clear_items(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM item_identifiers", [])?;
        tx.execute("DELETE FROM items", [])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_items(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM items")
    }

    fn count_items_with_editions(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM items WHERE editions_url IS NOT NULL")
    }

    fn count_available_by_source(&self) -> StorageResult<(u64, u64, u64)> {
        let bookchor = self.count(
            "SELECT COUNT(DISTINCT item_name) FROM item_identifiers WHERE kind = 'bookchor'",
        )?;
        let bookish_santa = self.count("SELECT COUNT(*) FROM items WHERE bookish_santa = 1")?;
        let shbi = self.count("SELECT COUNT(*) FROM items WHERE shbi = 1")?;
        Ok((bookchor, bookish_santa, shbi))
    }

    fn count_available_anywhere(&self) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM items
             WHERE bookish_santa = 1 OR shbi = 1
                OR name IN (SELECT item_name FROM item_identifiers WHERE kind = 'bookchor')",
        )
    }
}
