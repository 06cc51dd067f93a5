//! Client-persisted session state.
//!
//! A small key/value abstraction (the native analogue of browser local
//! storage) plus the typed credential accessor built on top of it.

use async_trait::async_trait;
use thiserror::Error;

pub mod credentials;
pub mod memory;
pub mod sqlite;

pub use credentials::{
    ACCESS_TOKEN_KEY, CredentialStorage, Persistence, REFRESH_TOKEN_KEY, TokenReader,
    USER_DATA_KEY,
};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to encode value for key '{key}': {reason}")]
    Encode { key: &'static str, reason: String },

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Asynchronous string key/value store.
///
/// Implementations are read-after-write consistent within one process; no
/// cross-process consistency is promised.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
