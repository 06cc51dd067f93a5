//! Session lifecycle: the only writer of Credential/Profile state and the
//! only trigger for auth-driven navigation.
//!
//! ```text
//! Uninitialized ──bootstrap──▶ Bootstrapping ──▶ Authenticated | Anonymous
//! Anonymous ──login/verify──▶ Authenticated
//! Authenticated ──logout──▶ Anonymous
//! ```
//!
//! Operations never panic and hand failures back as `Err` after logging them,
//! so a caller that ignores the result loses nothing but the error value.
//! A failed operation never leaves a half-authenticated session behind.
//!
//! Operations may interleave. Every transition (storage write, publish and
//! redirect) runs under one gate, and bootstrap only acts while the session
//! is still `Bootstrapping`.

use std::sync::Arc;

use chrono::Utc;
use merchantdesk_auth::{Credential, Profile, TokenStatus, inspect_token};
use thiserror::Error;
use tokio::sync::{Mutex, watch};

use crate::config::{AuthEndpoints, ClientConfig, Surfaces};
use crate::navigation::Navigator;
use crate::pipeline::{ApiRequest, PipelineError, RequestPipeline, StructuredHttpError};
use crate::storage::{CredentialStorage, Persistence, StorageError};

pub mod state;
pub mod wire;

pub use state::{Session, SessionHandle, SessionState, SessionSummary};
pub use wire::{LoginRequest, RegisterRequest, VerifyRequest};

use wire::{LoginGrant, VerifyGrant};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The server answered 2xx but without a usable token or profile.
    #[error("authentication response is missing the {0}")]
    IncompleteGrant(&'static str),

    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// The server's structured error, when the failure came from the server.
    pub fn http(&self) -> Option<&StructuredHttpError> {
        match self {
            SessionError::Pipeline(PipelineError::Http(err)) => Some(err),
            _ => None,
        }
    }
}

/// Why persisted state was not restored at bootstrap.
enum Restore {
    Session(Credential, Profile),
    /// No token stored; `orphaned_profile` flags a profile left without one.
    Missing { orphaned_profile: bool },
    Rejected(&'static str),
}

pub struct SessionLifecycle {
    pipeline: Arc<RequestPipeline>,
    storage: CredentialStorage,
    navigator: Arc<dyn Navigator>,
    endpoints: AuthEndpoints,
    surfaces: Surfaces,
    state: watch::Sender<Session>,
    /// Held across each transition so storage and the published session agree.
    transition: Mutex<()>,
}

impl SessionLifecycle {
    pub fn new(
        config: &ClientConfig,
        pipeline: Arc<RequestPipeline>,
        storage: CredentialStorage,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(Session::uninitialized());
        Self {
            pipeline,
            storage,
            navigator,
            endpoints: config.endpoints.clone(),
            surfaces: config.surfaces.clone(),
            state,
            transition: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionHandle {
        SessionHandle::new(self.state.subscribe())
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Rebuild the session from persisted state. Runs once; later calls
    /// return the current snapshot untouched.
    pub async fn bootstrap(&self) -> Session {
        let started = self.state.send_if_modified(|session| {
            if session.state() == SessionState::Uninitialized {
                *session = Session::bootstrapping();
                true
            } else {
                false
            }
        });
        if !started {
            return self.snapshot();
        }

        let restored = match self.restore().await {
            Ok(restored) => restored,
            Err(err) => {
                tracing::warn!(error = %err, "persisted session unreadable; starting anonymous");
                Restore::Rejected("unreadable")
            }
        };

        let _transition = self.transition.lock().await;
        if self.state.borrow().state() != SessionState::Bootstrapping {
            tracing::debug!("session settled while bootstrapping; keeping it");
            return self.snapshot();
        }

        match restored {
            Restore::Session(credential, profile) => {
                tracing::info!(user = %profile.id, "session restored");
                self.state
                    .send_replace(Session::authenticated(credential, profile));
            }
            Restore::Missing { orphaned_profile } => {
                if orphaned_profile {
                    tracing::warn!(
                        "session invariant violated: profile persisted without token; clearing"
                    );
                }
                self.discard_persisted().await;
                self.state.send_replace(Session::anonymous());
                self.redirect_to_login_unless_there();
            }
            Restore::Rejected(reason) => {
                tracing::info!(reason, "persisted session rejected; clearing");
                self.discard_persisted().await;
                self.state.send_replace(Session::anonymous());
                self.redirect_to_login_unless_there();
            }
        }

        self.snapshot()
    }

    /// Log in with email and password.
    pub async fn login(&self, request: LoginRequest) -> Result<Profile, SessionError> {
        let (credential, profile) = match self.exchange_login(&request).await {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                return Err(err);
            }
        };

        self.establish(credential, profile, request.remember_me).await
    }

    /// Confirm a pending login with a one-time code.
    pub async fn verify(&self, request: VerifyRequest) -> Result<Profile, SessionError> {
        let (credential, profile) = match self.exchange_verify(&request).await {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(error = %err, "verification failed");
                return Err(err);
            }
        };

        self.establish(credential, profile, request.remember_me).await
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(&self, request: RegisterRequest) -> Result<Profile, SessionError> {
        let outcome = match ApiRequest::post(self.endpoints.register.as_str()).json(&request) {
            Ok(api_request) => self.pipeline.dispatch(api_request).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "registration failed");
            return Err(err.into());
        }

        tracing::info!("registration accepted; logging in");
        self.login(request.login_request()).await
    }

    /// End the session. Safe to call when already anonymous.
    pub async fn logout(&self) {
        let _transition = self.transition.lock().await;
        self.state.send_replace(Session::anonymous());
        self.discard_persisted().await;
        tracing::info!("logged out");
        self.navigator.navigate(&self.surfaces.login);
    }

    async fn exchange_login(
        &self,
        request: &LoginRequest,
    ) -> Result<(Credential, Profile), SessionError> {
        let api_request = ApiRequest::post(self.endpoints.login.as_str()).json(request)?;
        let response = self.pipeline.dispatch(api_request).await?;
        response.json::<LoginGrant>()?.into_session_parts()
    }

    async fn exchange_verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<(Credential, Profile), SessionError> {
        let api_request = ApiRequest::post(self.endpoints.verify.as_str()).json(request)?;
        let response = self.pipeline.dispatch(api_request).await?;
        response.json::<VerifyGrant>()?.into_session_parts()
    }

    /// Persist, publish and redirect for a freshly granted session.
    async fn establish(
        &self,
        credential: Credential,
        profile: Profile,
        remember_me: bool,
    ) -> Result<Profile, SessionError> {
        let persistence = if remember_me {
            Persistence::Durable
        } else {
            Persistence::Volatile
        };

        let _transition = self.transition.lock().await;
        if let Err(err) = self.storage.store(&credential, &profile, persistence).await {
            tracing::error!(error = %err, "failed to persist session; staying logged out");
            return Err(err.into());
        }

        tracing::info!(user = %profile.id, remembered = remember_me, "logged in");
        self.state
            .send_replace(Session::authenticated(credential, profile.clone()));

        let target = self.redirect_target();
        self.navigator.navigate(&target);

        Ok(profile)
    }

    /// Where to go after logging in: the page the user wanted, else home.
    fn redirect_target(&self) -> String {
        self.navigator
            .intended_path()
            .filter(|path| !path.is_empty() && *path != self.surfaces.login)
            .unwrap_or_else(|| self.surfaces.home.clone())
    }

    async fn restore(&self) -> Result<Restore, StorageError> {
        let Some(token) = self.storage.persisted_access_token().await? else {
            let orphaned_profile = self.storage.persisted_user_data().await?.is_some();
            return Ok(Restore::Missing { orphaned_profile });
        };

        if let TokenStatus::Expired { expired_at } = inspect_token(&token, Utc::now()) {
            tracing::info!(%expired_at, "persisted access token has expired");
            return Ok(Restore::Rejected("expired"));
        }

        let Some(raw_profile) = self.storage.persisted_user_data().await? else {
            return Ok(Restore::Rejected("missing profile"));
        };
        let Ok(profile) = Profile::from_user_data(&raw_profile) else {
            return Ok(Restore::Rejected("undecodable profile"));
        };

        let refresh = self.storage.persisted_refresh_token().await?;
        match Credential::new(token, refresh) {
            Ok(credential) => Ok(Restore::Session(credential, profile)),
            Err(_) => Ok(Restore::Rejected("invalid token")),
        }
    }

    async fn discard_persisted(&self) {
        if let Err(err) = self.storage.clear().await {
            tracing::error!(error = %err, "failed to clear persisted session state");
        }
    }

    fn redirect_to_login_unless_there(&self) {
        let on_login = self
            .navigator
            .current_path()
            .is_some_and(|path| path == self.surfaces.login);
        if !on_login {
            self.navigator.navigate(&self.surfaces.login);
        }
    }
}

impl core::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("state", &self.state.borrow().state())
            .field("surfaces", &self.surfaces)
            .finish_non_exhaustive()
    }
}
