//! # Local Database Module
//!
//! Local persistence for offline-first operation. Everything the coordinator
//! keeps on the device, cached record arrays and the sync queue, is stored as
//! JSON documents in a single SQLite key/value table.
//!
//! ## Key Components
//!
//! - `LocalDatabase`: SQLite connection pool, schema and migrations
//! - `store.rs`: the [`KeyValueStore`] trait and the in-process [`MemoryStore`]
//! - `keys.rs`: per-user key naming
//! - `cache.rs`: the local cache store of record arrays
//! - `schema.rs`: schema SQL and migration versions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healss_sync::local_db::{KeyValueStore, LocalDatabase};
//!
//! # async fn example() -> healss_sync::shared::Result<()> {
//! let db = LocalDatabase::open("/tmp/healss/local.db").await?;
//! db.set("healss-activity-34cd56ef", "[]").await?;
//! let raw = db.get("healss-activity-34cd56ef").await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod keys;
pub mod schema;
pub mod store;

pub use cache::LocalCache;
pub use keys::KeyNamespace;
pub use store::{KeyValueStore, MemoryStore};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::shared::error::Result;

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates parent directories as needed. Uses WAL mode so readers are not
    /// blocked while the sync processor writes.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!("Opened local database at {}", path.display());

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Open a private in-memory database
    ///
    /// The pool is pinned to a single connection that never expires, otherwise
    /// each new connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_SCHEMA_MIGRATIONS)
            .execute(&self.pool)
            .await?;

        self.run_migrations().await
    }

    /// Apply every migration newer than the recorded schema version
    async fn run_migrations(&self) -> Result<()> {
        let current_version: (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if !schema::needs_migration(current_version.0) {
            return Ok(());
        }

        for version in schema::get_pending_migrations(current_version.0) {
            match version {
                1 => {
                    sqlx::query(schema::CREATE_KV_STORE)
                        .execute(&self.pool)
                        .await?;
                }
                other => {
                    tracing::warn!("No migration registered for schema version {}", other);
                    continue;
                }
            }

            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;

            tracing::info!("Applied local schema migration {}", version);
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database statistics
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let (key_count, value_bytes): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0) FROM kv_store")
                .fetch_one(&self.pool)
                .await?;

        let schema_version: (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        Ok(DatabaseStats {
            key_count: key_count as u64,
            value_bytes: value_bytes as u64,
            schema_version: schema_version.0,
        })
    }
}

#[async_trait]
impl KeyValueStore for LocalDatabase {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Number of stored keys
    pub key_count: u64,
    /// Total size of stored values, in bytes
    pub value_bytes: u64,
    /// Applied schema version
    pub schema_version: i32,
}
