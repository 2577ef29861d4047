//! Durable cache backend on SQLite
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Read failures degrade to cache misses so a damaged database never
//! blocks catalog browsing.

use crate::cache::store::StorageBackend;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Cache backend persisting entries to a local SQLite database
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        log::info!("Opened cache database: {}", path.display());
        Ok(Self { conn })
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            written_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    log::debug!("Cache schema initialized");
    Ok(())
}

impl StorageBackend for SqliteBackend {
    fn read_raw(&self, key: &str) -> Option<String> {
        let result = self
            .conn
            .query_row(
                "SELECT payload FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional();
        match result {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    fn write_raw(&mut self, key: &str, payload: &str) {
        let result = self.conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, payload, written_at)
             VALUES (?1, ?2, datetime('now'))",
            params![key, payload],
        );
        if let Err(e) = result {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    fn delete_raw(&mut self, key: &str) {
        if let Err(e) = self
            .conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
        {
            log::warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut stmt = match self.conn.prepare_cached("SELECT key FROM cache_entries") {
            Ok(stmt) => stmt,
            Err(e) => {
                log::warn!("Cache key listing failed: {}", e);
                return Vec::new();
            }
        };
        let rows = stmt.query_map([], |row| row.get::<_, String>(0));
        match rows {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                log::warn!("Cache key listing failed: {}", e);
                Vec::new()
            }
        }
    }
}
