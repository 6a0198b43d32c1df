//! HTTP server exposing the answer endpoint

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AskDocsConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Answer HTTP server
pub struct AskDocsServer {
    state: AppState,
}

impl AskDocsServer {
    /// Create a server with the providers of the configured backend
    pub fn new(config: AskDocsConfig) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    fn config(&self) -> &AskDocsConfig {
        self.state.config()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let server = &self.config().server;

        let router = Router::new()
            // Health check
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(RequestBodyLimitLayer::new(server.max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Log provider reachability. Startup continues either way.
    pub async fn check_providers(&self) {
        let orchestrator = self.state.orchestrator();
        let retriever = orchestrator.retrieval().provider();
        let generator = orchestrator.generation().provider();

        match retriever.health_check().await {
            Ok(true) => tracing::info!("Retrieval provider '{}' is reachable", retriever.name()),
            _ => tracing::warn!("Retrieval provider '{}' is not reachable", retriever.name()),
        }
        match generator.health_check().await {
            Ok(true) => tracing::info!(
                "Generation provider '{}' ({}) is reachable",
                generator.name(),
                generator.model()
            ),
            _ => tracing::warn!("Generation provider '{}' is not reachable", generator.name()),
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting askdocs server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        let server = &self.config().server;
        format!("{}:{}", server.host, server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
