//! Key-value persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The persistence adapter reads and writes opaque strings under
//! fixed keys and never executes SQL directly.

use crate::error::ClickerResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Browser-style string storage.
pub trait KvStore {
    fn get(&self, key: &str) -> ClickerResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClickerResult<()>;
    fn remove(&self, key: &str) -> ClickerResult<()>;
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> ClickerResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ClickerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a new, empty database.
    pub fn reopen(&self) -> ClickerResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ClickerResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_kv.sql"))?;
        Ok(())
    }

    pub fn keys(&self) -> ClickerResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> ClickerResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> ClickerResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ClickerResult<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
