//! Wiring of the client components.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::enrichment::Enricher;
use crate::navigation::Navigator;
use crate::pipeline::{PipelineError, RequestPipeline};
use crate::session::SessionLifecycle;
use crate::storage::{CredentialStorage, KeyValueStore};

/// Application state shared by every dashboard surface.
///
/// Surfaces issue requests through `pipeline` and observe or drive the
/// session through `session`; neither touches storage directly.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub session: Arc<SessionLifecycle>,
}

impl AppState {
    /// Build the pipeline and lifecycle over one shared credential store.
    ///
    /// Nothing is read from storage until [`SessionLifecycle::bootstrap`] runs.
    pub fn new(
        config: &ClientConfig,
        durable: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, PipelineError> {
        let enricher = Enricher::from_config(config).unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                "client context lookups unavailable; requests go out unenriched"
            );
            Enricher::disabled()
        });
        Self::with_enricher(config, durable, navigator, enricher)
    }

    pub fn with_enricher(
        config: &ClientConfig,
        durable: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        enricher: Enricher,
    ) -> Result<Self, PipelineError> {
        let storage = CredentialStorage::new(durable);
        let pipeline = Arc::new(RequestPipeline::new(config, storage.reader(), enricher)?);
        let session = Arc::new(SessionLifecycle::new(
            config,
            pipeline.clone(),
            storage,
            navigator,
        ));

        Ok(Self { pipeline, session })
    }
}
