//! Authenticated principal attributes and grants.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{PermissionGrant, Role};

/// Backend identifier of a dashboard user.
///
/// The backend emits ids either as JSON strings or numbers depending on the
/// endpoint; both deserialize into the same string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// The authenticated user's attributes and authorization grants.
///
/// Serialized in camelCase, which is both the login response shape and the
/// persisted `userData` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub mobile_num: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

impl Profile {
    /// Decode a persisted `userData` value.
    pub fn from_user_data(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encode for persistence under `userData`.
    pub fn to_user_data(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_permitted(&self, module: &str, action: &str) -> bool {
        crate::authorize(self, module, action).is_ok()
    }
}
