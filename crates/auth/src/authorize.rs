use thiserror::Error;

use crate::Profile;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{module}:{action}'")]
    Forbidden { module: String, action: String },
}

/// Authorize a profile for `action` on a dashboard module.
///
/// - No IO
/// - No panics
/// - Superadmins are allowed everything; everyone else needs a matching grant
pub fn authorize(profile: &Profile, module: &str, action: &str) -> Result<(), AuthzError> {
    if profile.role.is_superadmin() {
        return Ok(());
    }

    if profile
        .permissions
        .iter()
        .any(|grant| grant.covers(module, action))
    {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            module: module.to_string(),
            action: action.to_string(),
        })
    }
}
