//! Bedrock knowledge base retriever
//!
//! Semantic search over an ingested knowledge base. Embedding, indexing and
//! nearest-neighbour search all happen in the managed service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::BedrockAuth;
use crate::error::{Error, Result};
use crate::providers::{truncate_body, RetrievalProvider};
use crate::types::Passage;

/// Metadata key carrying the chunk identifier
const CHUNK_ID_KEY: &str = "x-amz-bedrock-kb-chunk-id";

/// Service-side limit on `numberOfResults`
const MAX_RESULTS: usize = 100;

/// Knowledge base retriever
pub struct KnowledgeBaseRetriever {
    auth: Arc<BedrockAuth>,
    knowledge_base_id: String,
    search_type: String,
}

impl KnowledgeBaseRetriever {
    /// Create a new retriever
    ///
    /// # Arguments
    /// * `auth` - Bedrock connection
    /// * `knowledge_base_id` - Knowledge base to query
    /// * `search_type` - `SEMANTIC` or `HYBRID`
    pub fn new(auth: Arc<BedrockAuth>, knowledge_base_id: String, search_type: String) -> Self {
        Self {
            auth,
            knowledge_base_id,
            search_type,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/knowledgebases/{}/retrieve",
            self.auth.agent_runtime_endpoint(),
            self.knowledge_base_id
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    retrieval_query: RetrievalQuery<'a>,
    retrieval_configuration: RetrievalConfiguration<'a>,
}

#[derive(Serialize)]
struct RetrievalQuery<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfiguration<'a> {
    vector_search_configuration: VectorSearchConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchConfiguration<'a> {
    number_of_results: usize,
    override_search_type: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Deserialize)]
struct RetrievalResult {
    content: ResultContent,
    #[serde(default)]
    location: Option<ResultLocation>,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct ResultContent {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultLocation {
    #[serde(default)]
    s3_location: Option<UriLocation>,
    #[serde(default)]
    web_location: Option<UrlLocation>,
    #[serde(default)]
    confluence_location: Option<UrlLocation>,
}

#[derive(Deserialize)]
struct UriLocation {
    uri: String,
}

#[derive(Deserialize)]
struct UrlLocation {
    url: String,
}

impl RetrievalResult {
    fn source(&self) -> String {
        self.location
            .as_ref()
            .and_then(|loc| {
                loc.s3_location
                    .as_ref()
                    .map(|s| s.uri.clone())
                    .or_else(|| loc.web_location.as_ref().map(|w| w.url.clone()))
                    .or_else(|| loc.confluence_location.as_ref().map(|c| c.url.clone()))
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn into_passage(self, index: usize) -> Passage {
        let source = self.source();
        let id = self
            .metadata
            .as_ref()
            .and_then(|m| m.get(CHUNK_ID_KEY))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", source, index));

        Passage {
            id,
            text: self.content.text,
            score: self.score.unwrap_or(0.0),
            source,
        }
    }
}

#[async_trait]
impl RetrievalProvider for KnowledgeBaseRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let request = RetrieveRequest {
            retrieval_query: RetrievalQuery { text: query },
            retrieval_configuration: RetrievalConfiguration {
                vector_search_configuration: VectorSearchConfiguration {
                    number_of_results: top_k.min(MAX_RESULTS),
                    override_search_type: &self.search_type,
                },
            },
        };

        let response = self
            .auth
            .client()
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::retrieval_unavailable(format!("Knowledge base request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::retrieval_unavailable(format!(
                "Knowledge base retrieve failed ({}): {}",
                status,
                truncate_body(&body)
            )));
        }

        let parsed: RetrieveResponse = response.json().await.map_err(|e| {
            Error::retrieval_unavailable(format!("Failed to parse knowledge base response: {}", e))
        })?;

        tracing::debug!(
            "Knowledge base {} returned {} results",
            self.knowledge_base_id,
            parsed.retrieval_results.len()
        );

        Ok(parsed
            .retrieval_results
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_passage(i))
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        // No cheap read-only call exists; a one-result query exercises auth and routing.
        match self.retrieve("health", 1).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Knowledge base health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &'static str {
        "bedrock-knowledge-base"
    }
}
