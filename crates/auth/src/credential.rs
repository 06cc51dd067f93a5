use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("access token is empty")]
    EmptyAccessToken,
}

/// Opaque bearer token pair identifying an authenticated session.
///
/// The client never interprets token contents for authorization; expiry is
/// discovered when a protected call fails (or peeked at bootstrap, see
/// [`crate::claims`]).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
    refresh_token: Option<String>,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Result<Self, CredentialError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(CredentialError::EmptyAccessToken);
        }

        Ok(Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        bearer_value(&self.access_token)
    }
}

/// Format a raw access token as an `Authorization` header value.
pub fn bearer_value(access_token: &str) -> String {
    format!("Bearer {access_token}")
}

// Tokens must never end up in logs.
impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
