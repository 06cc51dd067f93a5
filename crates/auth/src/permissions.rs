use serde::{Deserialize, Serialize};

/// Wildcard action granting every action on a module.
pub const ANY_ACTION: &str = "*";

/// A single authorization grant: `action` on the dashboard module `module_name`
/// (e.g. `invoice` / `create`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub module_name: String,
    pub action: String,
}

impl PermissionGrant {
    pub fn new(module_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            action: action.into(),
        }
    }

    /// Whether this grant allows `action` on `module`.
    ///
    /// Module and action names are compared case-insensitively.
    pub fn covers(&self, module: &str, action: &str) -> bool {
        self.module_name.eq_ignore_ascii_case(module)
            && (self.action == ANY_ACTION || self.action.eq_ignore_ascii_case(action))
    }
}

impl core::fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.module_name, self.action)
    }
}
