// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed key-value store.
//!
//! All namespaces share one table. Writes are single statements, so a value
//! is either fully replaced or left untouched.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{StorageError, StorageResult};
use crate::store::{BoxFuture, KvStore};

/// SQL schema for the key-value table.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
);
"#;

/// Durable [`KvStore`] on a SQLite database file.
///
/// Statements run on the blocking thread pool, so a busy database never
/// stalls an async worker.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    /// Total byte budget across all namespaces.
    quota: Option<u64>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
            quota: None,
        })
    }

    /// Limit the total size of stored values.
    pub fn with_quota(mut self, quota: Option<u64>) -> Self {
        self.quota = quota;
        self
    }

    /// Run `op` against the connection on the blocking pool.
    fn run<T, F>(&self, op: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn
                    .lock()
                    .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
                op(&conn)
            })
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {e}")))?
        })
    }
}

fn get_sync(conn: &Connection, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn put_sync(
    conn: &Connection,
    quota: Option<u64>,
    namespace: &str,
    key: &str,
    value: &[u8],
) -> StorageResult<()> {
    if let Some(quota) = quota {
        let others: i64 = conn.query_row(
            "SELECT COALESCE(SUM(length(value)), 0) FROM kv
             WHERE NOT (namespace = ?1 AND key = ?2)",
            params![namespace, key],
            |row| row.get(0),
        )?;
        let needed = others.max(0) as u64 + value.len() as u64;
        if needed > quota {
            return Err(StorageError::CapacityExceeded { needed, quota });
        }
    }

    conn.execute(
        "INSERT INTO kv (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(namespace, key) DO UPDATE
         SET value = excluded.value, updated_at = excluded.updated_at",
        params![namespace, key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn delete_sync(conn: &Connection, namespace: &str, key: &str) -> StorageResult<()> {
    conn.execute(
        "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
        params![namespace, key],
    )?;
    Ok(())
}

fn list_keys_sync(conn: &Connection, namespace: &str) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT key FROM kv WHERE namespace = ?1")?;
    let keys = stmt
        .query_map(params![namespace], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}

impl KvStore for SqliteStore {
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, StorageResult<Option<Vec<u8>>>> {
        let (namespace, key) = (namespace.to_string(), key.to_string());
        self.run(move |conn| get_sync(conn, &namespace, &key))
    }

    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        let (namespace, key, quota) = (namespace.to_string(), key.to_string(), self.quota);
        self.run(move |conn| put_sync(conn, quota, &namespace, &key, &value))
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        let (namespace, key) = (namespace.to_string(), key.to_string());
        self.run(move |conn| delete_sync(conn, &namespace, &key))
    }

    fn list_keys<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, StorageResult<Vec<String>>> {
        let namespace = namespace.to_string();
        self.run(move |conn| list_keys_sync(conn, &namespace))
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
