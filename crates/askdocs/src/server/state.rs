//! Application state for the answer server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::AskDocsConfig;
use crate::error::Result;
use crate::orchestrator::QueryOrchestrator;
use crate::providers::{build_providers, GenerationProvider, RetrievalProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: Arc<AskDocsConfig>,
    /// Request handler
    orchestrator: QueryOrchestrator,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the providers of the configured backend
    pub fn new(config: AskDocsConfig) -> Result<Self> {
        tracing::info!("Initializing application state (backend: {:?})...", config.backend);

        let (retriever, generator) = build_providers(&config)?;
        Ok(Self::with_providers(config, retriever, generator))
    }

    /// Create application state around explicit providers
    pub fn with_providers(
        config: AskDocsConfig,
        retriever: Arc<dyn RetrievalProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let orchestrator = QueryOrchestrator::new(Arc::clone(&config), retriever, generator);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AskDocsConfig {
        &self.inner.config
    }

    /// Get the request handler
    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.inner.orchestrator
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
