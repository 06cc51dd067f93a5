//! Typed access to the persisted Credential/Profile keys.

use std::sync::Arc;

use merchantdesk_auth::{Credential, Profile};

use super::{KeyValueStore, MemoryStore, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_DATA_KEY: &str = "userData";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY];

/// Where a freshly established session is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Survives restarts ("remember me").
    Durable,
    /// Lives only as long as this process.
    Volatile,
}

/// Two-tier credential storage: a durable store for remembered sessions and
/// an in-process tier for everything else.
///
/// Only the session lifecycle writes through this type; the request pipeline
/// gets a [`TokenReader`].
#[derive(Clone)]
pub struct CredentialStorage {
    durable: Arc<dyn KeyValueStore>,
    volatile: Arc<MemoryStore>,
}

impl CredentialStorage {
    pub fn new(durable: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            volatile: Arc::new(MemoryStore::new()),
        }
    }

    /// Read-only view for request dispatch.
    pub fn reader(&self) -> TokenReader {
        TokenReader {
            storage: self.clone(),
        }
    }

    /// Token to send right now: the in-process tier wins over the durable one.
    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        if let Some(token) = non_empty(self.volatile.get(ACCESS_TOKEN_KEY).await?) {
            return Ok(Some(token));
        }
        Ok(non_empty(self.durable.get(ACCESS_TOKEN_KEY).await?))
    }

    pub async fn persisted_access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(non_empty(self.durable.get(ACCESS_TOKEN_KEY).await?))
    }

    pub async fn persisted_refresh_token(&self) -> Result<Option<String>, StorageError> {
        Ok(non_empty(self.durable.get(REFRESH_TOKEN_KEY).await?))
    }

    /// Raw persisted `userData`; decoding is the caller's concern.
    pub async fn persisted_user_data(&self) -> Result<Option<String>, StorageError> {
        Ok(non_empty(self.durable.get(USER_DATA_KEY).await?))
    }

    /// Write a complete session into one tier and empty the other.
    ///
    /// Either every key is written or none remains: on failure the target
    /// tier is wiped again before the error is returned.
    pub async fn store(
        &self,
        credential: &Credential,
        profile: &Profile,
        persistence: Persistence,
    ) -> Result<(), StorageError> {
        let user_data = profile.to_user_data().map_err(|e| StorageError::Encode {
            key: USER_DATA_KEY,
            reason: e.to_string(),
        })?;

        let durable: &dyn KeyValueStore = self.durable.as_ref();
        let volatile: &dyn KeyValueStore = self.volatile.as_ref();
        let (target, other) = match persistence {
            Persistence::Durable => (durable, volatile),
            Persistence::Volatile => (volatile, durable),
        };

        clear_tier(other).await?;

        if let Err(err) = write_session(target, credential, &user_data).await {
            if let Err(cleanup) = clear_tier(target).await {
                tracing::error!(error = %cleanup, "failed to roll back partial session write");
            }
            return Err(err);
        }

        Ok(())
    }

    /// Remove every session key from both tiers.
    ///
    /// All removals are attempted; the first failure is reported.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let volatile = clear_tier(self.volatile.as_ref()).await;
        let durable = clear_tier(self.durable.as_ref()).await;
        volatile.and(durable)
    }
}

impl core::fmt::Debug for CredentialStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialStorage").finish_non_exhaustive()
    }
}

async fn write_session(
    store: &dyn KeyValueStore,
    credential: &Credential,
    user_data: &str,
) -> Result<(), StorageError> {
    store.set(ACCESS_TOKEN_KEY, credential.access_token()).await?;
    match credential.refresh_token() {
        Some(refresh) => store.set(REFRESH_TOKEN_KEY, refresh).await?,
        None => store.remove(REFRESH_TOKEN_KEY).await?,
    }
    store.set(USER_DATA_KEY, user_data).await
}

async fn clear_tier(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    let mut first_error = None;
    for key in SESSION_KEYS {
        if let Err(err) = store.remove(key).await {
            tracing::warn!(key, error = %err, "failed to remove session key");
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read-only access to the current access token.
#[derive(Clone, Debug)]
pub struct TokenReader {
    storage: CredentialStorage,
}

impl TokenReader {
    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.storage.access_token().await
    }
}
