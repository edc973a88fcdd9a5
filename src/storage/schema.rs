//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Edition-Scout
//! accumulation store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scout runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    dropped INTEGER NOT NULL DEFAULT 0
);

-- One row per resolved item, keyed by name
CREATE TABLE IF NOT EXISTS items (
    name TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    editions_url TEXT,
    author TEXT,
    series TEXT,
    bookish_santa INTEGER NOT NULL DEFAULT 0,
    shbi INTEGER NOT NULL DEFAULT 0,
    checked_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_url ON items(url);

-- ISBN-13 identifiers and Bookchor hits of each item
-- kind is 'isbn13' for an editions-page identifier, 'bookchor' for an in-stock hit
CREATE TABLE IF NOT EXISTS item_identifiers (
    item_name TEXT NOT NULL REFERENCES items(name) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    identifier TEXT NOT NULL,
    position INTEGER NOT NULL,
    UNIQUE(item_name, kind, identifier)
);

CREATE INDEX IF NOT EXISTS idx_item_identifiers_item ON item_identifiers(item_name);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
