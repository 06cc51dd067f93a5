//! `merchantdesk-auth`: credential and principal model for the dashboard client.
//!
//! No HTTP and no storage here: this crate knows what a session *is*, not how
//! it is obtained or persisted.

pub mod authorize;
pub mod claims;
pub mod credential;
pub mod permissions;
pub mod profile;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{TokenStatus, inspect_token};
pub use credential::{Credential, CredentialError, bearer_value};
pub use permissions::PermissionGrant;
pub use profile::{Profile, ProfileId};
pub use roles::Role;
