//! SQLite-backed durable key/value store.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use super::{KeyValueStore, StorageError};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Durable store for session state that survives restarts.
///
/// The database is opened lazily on first use, so constructing the store never
/// touches the filesystem.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    location: Location,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteStore {
    /// Store backed by the database file at `path` (created if missing).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the pool, initializing the database on first use.
    async fn pool(&self) -> Result<SqlitePool, StorageError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let options = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::Backend(format!(
                            "failed to create state directory at {parent:?}: {e}"
                        ))
                    })?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
            }
            Location::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        };

        // A single connection: every `:memory:` connection is its own database,
        // and the client is single-threaded anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to open state database: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::Backend(format!("failed to create client_state table: {e}")))?;

        tracing::debug!(location = ?self.location, "state database ready");

        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT value FROM client_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        sqlx::query(
            r#"
            INSERT INTO client_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE
               SET value = excluded.value,
                   updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        sqlx::query("DELETE FROM client_state WHERE key = ?1")
            .bind(key)
            .execute(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }
}
