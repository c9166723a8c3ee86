//! SQLite-based log store.
//!
//! The table is keyed by `(city, created_at)` and provisioned on open if it
//! does not exist yet. rusqlite is blocking, so every call hops onto the
//! blocking pool.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use skycache_core::config::is_sql_identifier;
use skycache_core::{RusqliteErrorExt, StorageError};
use std::path::Path;
use std::sync::Arc;

use crate::log::{CacheLogEntry, LogStore};
use crate::StoreResult;

/// SQLite-backed cache log.
#[derive(Clone)]
pub struct SqliteLogStore {
    conn: Arc<Mutex<Connection>>,
    table: Arc<str>,
}

impl SqliteLogStore {
    /// Open (or create) the database at `path` and provision `table`.
    ///
    /// # Errors
    /// `StorageError::InvalidKey` for a table name that is not a plain SQL
    /// identifier, `StorageError::Backend` if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::backend(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_storage_error)?;
        Self::with_connection(conn, table)
    }

    /// In-memory database, dropped with the store.
    pub fn in_memory(table: &str) -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_storage_error)?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: &str) -> StoreResult<Self> {
        if !is_sql_identifier(table) {
            return Err(StorageError::InvalidKey(format!("invalid table name '{}'", table)));
        }
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            table: Arc::from(table),
        };
        store.provision()?;
        Ok(store)
    }

    /// Create the log table unless it already exists.
    fn provision(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        let exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![&*self.table],
                |row| row.get(0),
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;

        if exists > 0 {
            tracing::info!("Table '{}' already exists.", self.table);
            return Ok(());
        }

        tracing::info!("Creating table '{}'...", self.table);
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                city TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                storage_path TEXT NOT NULL,
                PRIMARY KEY (city, created_at)
            );
            "#,
            table = self.table
        ))
        .map_err(RusqliteErrorExt::into_storage_error)?;
        tracing::info!("Table '{}' created successfully.", self.table);
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of entries across all cities.
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })
            .map_err(RusqliteErrorExt::into_storage_error)?;
        usize::try_from(count)
            .map_err(|e| StorageError::backend(format!("invalid row count {}: {}", count, e)))
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = Arc::clone(&self.table);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn, &table).map_err(RusqliteErrorExt::into_storage_error)
        })
        .await
        .map_err(|e| StorageError::backend(format!("log store task failed: {}", e)))?
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn insert(&self, entry: &CacheLogEntry) -> StoreResult<()> {
        let entry = entry.clone();
        self.with_conn(move |conn, table| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {} (city, created_at, storage_path) VALUES (?1, ?2, ?3)",
                    table
                ),
                params![entry.city, entry.created_at, entry.storage_path],
            )
            .map(|_| ())
        })
        .await
    }

    async fn find_latest(&self, city: &str, cutoff: i64) -> StoreResult<Option<CacheLogEntry>> {
        let city = city.to_string();
        self.with_conn(move |conn, table| {
            conn.query_row(
                &format!(
                    "SELECT city, created_at, storage_path FROM {}
                     WHERE city = ?1 AND created_at >= ?2
                     ORDER BY created_at DESC
                     LIMIT 1",
                    table
                ),
                params![city, cutoff],
                |row| {
                    Ok(CacheLogEntry {
                        city: row.get(0)?,
                        created_at: row.get(1)?,
                        storage_path: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
    }
}
