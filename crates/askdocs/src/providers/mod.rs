//! Provider abstractions for the retrieval and generation services
//!
//! This module provides trait-based abstractions that allow switching between
//! plain HTTP services and Bedrock (knowledge base + runtime) backends.

pub mod bedrock;
pub mod generator;
pub mod http;
pub mod retriever;

pub use generator::GenerationProvider;
pub use http::{HttpGenerator, HttpRetriever};
pub use retriever::RetrievalProvider;

use reqwest::{header, Client, StatusCode};
use std::sync::Arc;

use crate::config::{AskDocsConfig, BackendProvider};
use crate::error::{Error, Result};
use bedrock::{BedrockAuth, KnowledgeBaseRetriever, RuntimeGenerator};

/// Retrieval and generation providers for the configured backend
pub fn build_providers(
    config: &AskDocsConfig,
) -> Result<(Arc<dyn RetrievalProvider>, Arc<dyn GenerationProvider>)> {
    match config.backend {
        BackendProvider::Http => {
            tracing::info!(
                "Using http backend (retrieval: {}, generation: {})",
                config.http.retrieval_url,
                config.http.generation_url
            );
            let retriever = Arc::new(HttpRetriever::from_config(&config.http)?);
            let generator = Arc::new(HttpGenerator::from_config(&config.http)?);
            Ok((retriever, generator))
        }
        BackendProvider::Bedrock => {
            let bedrock = config.bedrock.as_ref().ok_or_else(|| {
                Error::Config("Bedrock backend selected but bedrock config is missing".to_string())
            })?;

            tracing::info!(
                "Using bedrock backend (region: {}, knowledge base: {}, model: {})",
                bedrock.region,
                bedrock.knowledge_base_id,
                bedrock.model_id
            );

            let auth = Arc::new(BedrockAuth::from_config(bedrock)?);
            let retriever = Arc::new(KnowledgeBaseRetriever::new(
                Arc::clone(&auth),
                bedrock.knowledge_base_id.clone(),
                bedrock.search_type.clone(),
            ));

            let mut generator = RuntimeGenerator::new(Arc::clone(&auth), bedrock.model_id.clone());
            if let Some(guardrail_id) = &bedrock.guardrail_id {
                generator =
                    generator.with_guardrail(guardrail_id.clone(), bedrock.guardrail_version.clone());
            }

            Ok((retriever, Arc::new(generator)))
        }
    }
}

/// Build an HTTP client, optionally sending a bearer token on every request
pub(crate) fn build_client(bearer_token: Option<&str>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    if let Some(token) = bearer_token {
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| Error::Config(format!("Invalid bearer token: {}", e)))?;
        headers.insert(header::AUTHORIZATION, value);
    }

    Client::builder()
        .default_headers(headers)
        .pool_max_idle_per_host(8)
        .build()
        .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))
}

/// How a non-success HTTP status from a generation service is classified
pub(crate) fn generation_status_error(status: StatusCode, body: &str) -> Error {
    let detail = format!("({}): {}", status, truncate_body(body));
    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::FORBIDDEN
        | StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
            Error::generation_rejected(format!("request refused {}", detail))
        }
        _ => Error::generation_unavailable(format!("generation failed {}", detail)),
    }
}

/// Keep error bodies short enough for logs
pub(crate) fn truncate_body(body: &str) -> &str {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
