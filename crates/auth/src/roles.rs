use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role attached to a dashboard principal (e.g. "admin", "merchant").
///
/// Roles are opaque strings issued by the backend. Comparison helpers are
/// case-insensitive because the backend is not consistent about casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const SUPERADMIN: Role = Role(Cow::Borrowed("superadmin"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const MERCHANT: Role = Role(Cow::Borrowed("merchant"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive equality against another role.
    pub fn matches(&self, other: &Role) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }

    /// Superadmins bypass permission grants entirely.
    pub fn is_superadmin(&self) -> bool {
        self.matches(&Role::SUPERADMIN)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::MERCHANT
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
