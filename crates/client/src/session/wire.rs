//! Request and response bodies of the authentication endpoints.

use merchantdesk_auth::{Credential, Profile};
use serde::{Deserialize, Serialize};

use super::SessionError;

/// Email/password login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Persist the session across restarts.
    #[serde(skip)]
    pub remember_me: bool,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: false,
        }
    }

    pub fn remember(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

/// Second-factor confirmation (OTP sent after a first login step).
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyRequest {
    pub token: String,
    pub otp: String,
    #[serde(skip)]
    pub remember_me: bool,
}

/// New merchant account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip)]
    pub remember_me: bool,
}

impl RegisterRequest {
    pub(crate) fn login_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            remember_me: self.remember_me,
        }
    }
}

/// Login endpoint answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginGrant {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

impl LoginGrant {
    pub(crate) fn into_session_parts(self) -> Result<(Credential, Profile), SessionError> {
        session_parts(self.access_token, self.refresh_token, self.profile)
    }
}

/// Verification endpoint answer.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyGrant {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

impl VerifyGrant {
    pub(crate) fn into_session_parts(self) -> Result<(Credential, Profile), SessionError> {
        session_parts(self.access, self.refresh, self.profile)
    }
}

fn session_parts(
    access: Option<String>,
    refresh: Option<String>,
    profile: Option<Profile>,
) -> Result<(Credential, Profile), SessionError> {
    let access = access.ok_or(SessionError::IncompleteGrant("access token"))?;
    let credential = Credential::new(access, refresh)
        .map_err(|_| SessionError::IncompleteGrant("access token"))?;
    let profile = profile.ok_or(SessionError::IncompleteGrant("profile"))?;
    Ok((credential, profile))
}
