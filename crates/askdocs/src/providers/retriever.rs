//! Retrieval provider trait for semantic search services

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Passage;

/// Trait for semantic passage retrieval
///
/// Implementations:
/// - `HttpRetriever`: JSON service taking `{query, top_k}`
/// - `KnowledgeBaseRetriever`: Bedrock knowledge base
///
/// Implementations report transport failures and malformed responses as
/// `Error::RetrievalUnavailable`. Deadlines are enforced by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Search for passages relevant to `query`
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &'static str;
}
