//! Session value object and the read-only handle page collaborators observe.

use merchantdesk_auth::{Credential, Profile};
use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle state of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Process started; persisted state not read yet.
    Uninitialized,
    /// Persisted state is being read.
    Bootstrapping,
    /// Credential and Profile present.
    Authenticated,
    /// No valid Credential.
    Anonymous,
}

/// Snapshot of the session.
///
/// There is no way to build a session holding a profile without a
/// credential: the only non-empty constructor takes both.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: SessionState,
    credential: Option<Credential>,
    profile: Option<Profile>,
    loading: bool,
}

impl Session {
    pub(crate) fn uninitialized() -> Self {
        Self {
            state: SessionState::Uninitialized,
            credential: None,
            profile: None,
            loading: true,
        }
    }

    pub(crate) fn bootstrapping() -> Self {
        Self {
            state: SessionState::Bootstrapping,
            ..Self::uninitialized()
        }
    }

    pub(crate) fn authenticated(credential: Credential, profile: Profile) -> Self {
        Self {
            state: SessionState::Authenticated,
            credential: Some(credential),
            profile: Some(profile),
            loading: false,
        }
    }

    pub(crate) fn anonymous() -> Self {
        Self {
            state: SessionState::Anonymous,
            credential: None,
            profile: None,
            loading: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Token-free view suitable for display or logging.
    pub fn summary(&self) -> SessionSummary<'_> {
        SessionSummary {
            state: self.state,
            loading: self.loading,
            profile: self.profile.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary<'a> {
    pub state: SessionState,
    pub loading: bool,
    pub profile: Option<&'a Profile>,
}

/// Read-only subscription to session changes.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    pub(crate) fn new(rx: watch::Receiver<Session>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    /// Wait for the next published session. `None` once the lifecycle is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
