//! Unverified inspection of bearer token claims.
//!
//! The client is not the authority on token validity; the backend is. This
//! module only peeks at the `exp` claim of JWT-shaped tokens so a stale
//! persisted session can be dropped at bootstrap instead of on the first
//! failed call. Signatures are never checked here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// What could be learned about a token without verifying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Not a JWT, or a JWT without a readable `exp`.
    Opaque,
    /// `exp` lies in the future.
    Live { expires_at: DateTime<Utc> },
    /// `exp` lies at or before `now`.
    Expired { expired_at: DateTime<Utc> },
}

impl TokenStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenStatus::Expired { .. })
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Peek at the expiry of `token` relative to `now`.
pub fn inspect_token(token: &str, now: DateTime<Utc>) -> TokenStatus {
    let Some(expires_at) = peek_expiry(token) else {
        return TokenStatus::Opaque;
    };

    if now >= expires_at {
        TokenStatus::Expired {
            expired_at: expires_at,
        }
    } else {
        TokenStatus::Live { expires_at }
    }
}

fn peek_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claim.exp?, 0).single()
}
