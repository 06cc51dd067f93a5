//! `merchantdesk-client`
//!
//! **Responsibility:** Authenticated HTTP access to the merchant dashboard API.
//!
//! This crate provides:
//! - A single-attempt request pipeline that attaches the bearer token and
//!   best-effort client context (`X-IP`, `X-Location`)
//! - The session lifecycle (bootstrap, login, verify, register, logout) and
//!   the navigation it triggers
//! - Two-tier persisted credential storage
//!
//! The API remains the authority: the client never refreshes tokens and
//! never retries requests.

pub mod app;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod navigation;
pub mod pipeline;
pub mod session;
pub mod storage;

pub use app::AppState;
pub use config::{ClientConfig, ConfigError};
pub use enrichment::{ClientContext, Coordinates, Enricher};
pub use navigation::{HistoryNavigator, Navigator};
pub use pipeline::{ApiRequest, ApiResponse, PipelineError, RequestPipeline, StructuredHttpError};
pub use session::{
    LoginRequest, RegisterRequest, Session, SessionError, SessionHandle, SessionLifecycle,
    SessionState, VerifyRequest,
};
pub use storage::{CredentialStorage, KeyValueStore, MemoryStore, SqliteStore, StorageError};
