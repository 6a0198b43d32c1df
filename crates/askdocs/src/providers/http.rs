//! JSON-over-HTTP retrieval and generation services
//!
//! Retrieval: `POST {query, top_k}` -> `{passages: [{id, text, score, source}]}`
//! Generation: `POST {prompt, system?, temperature, max_tokens, stop_sequences}` -> `{text}`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{build_client, generation_status_error, truncate_body};
use super::{GenerationProvider, RetrievalProvider};
use crate::config::{GenerationConfig, HttpBackendConfig};
use crate::error::{Error, Result};
use crate::generation::Prompt;
use crate::types::Passage;

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    passages: Vec<Passage>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f32,
    max_tokens: u32,
    stop_sequences: &'a [String],
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Retrieval service client
pub struct HttpRetriever {
    client: Client,
    url: String,
}

impl HttpRetriever {
    /// Create a new retrieval client
    pub fn new(url: impl Into<String>, bearer_token: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: build_client(bearer_token)?,
            url: url.into(),
        })
    }

    /// Create from backend configuration
    pub fn from_config(config: &HttpBackendConfig) -> Result<Self> {
        Self::new(config.retrieval_url.clone(), config.bearer_token.as_deref())
    }
}

#[async_trait]
impl RetrievalProvider for HttpRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let response = self
            .client
            .post(&self.url)
            .json(&RetrieveRequest { query, top_k })
            .send()
            .await
            .map_err(|e| Error::retrieval_unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::retrieval_unavailable(format!(
                "retrieval failed ({}): {}",
                status,
                truncate_body(&body)
            )));
        }

        let parsed: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| Error::retrieval_unavailable(format!("malformed response: {}", e)))?;

        Ok(parsed.passages)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.head(&self.url).send().await {
            Ok(response) => Ok(!response.status().is_server_error()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Generation service client
pub struct HttpGenerator {
    client: Client,
    url: String,
}

impl HttpGenerator {
    /// Create a new generation client
    pub fn new(url: impl Into<String>, bearer_token: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: build_client(bearer_token)?,
            url: url.into(),
        })
    }

    /// Create from backend configuration
    pub fn from_config(config: &HttpBackendConfig) -> Result<Self> {
        Self::new(config.generation_url.clone(), config.bearer_token.as_deref())
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerator {
    async fn generate(&self, prompt: &Prompt, config: &GenerationConfig) -> Result<String> {
        let request = GenerateRequest {
            prompt: prompt.text(),
            system: prompt.system(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stop_sequences: &config.stop_sequences,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation_unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(generation_status_error(status, &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::generation_unavailable(format!("malformed response: {}", e)))?;

        Ok(parsed.text)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.head(&self.url).send().await {
            Ok(response) => Ok(!response.status().is_server_error()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }

    fn model(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::generation::{PromptAssembler, PromptTemplate};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serve `router` on an ephemeral port and return its base URL
    async fn spawn_service(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn prompt(question: &str) -> Prompt {
        PromptAssembler::new(10_000)
            .assemble(question, &[], &PromptTemplate::default(), None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_parses_passages() {
        let router = Router::new().route(
            "/retrieve",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["query"], "What is the refund policy?");
                assert_eq!(body["top_k"], 3);
                Json(json!({
                    "passages": [
                        {"id": "p1", "text": "Refunds within 30 days.", "score": 0.9, "source": "s3://docs/refunds.pdf"},
                        {"id": "p2", "text": "Store credit otherwise.", "score": 0.7, "source": "s3://docs/refunds.pdf"}
                    ]
                }))
            }),
        );
        let base = spawn_service(router).await;

        let retriever = HttpRetriever::new(format!("{}/retrieve", base), None).unwrap();
        let passages = retriever.retrieve("What is the refund policy?", 3).await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].id, "p1");
        assert_eq!(passages[1].score, 0.7);
    }

    #[tokio::test]
    async fn test_retrieve_malformed_response_is_unavailable() {
        let router = Router::new().route(
            "/retrieve",
            post(|| async { Json(json!({"results": "nope"})) }),
        );
        let base = spawn_service(router).await;

        let retriever = HttpRetriever::new(format!("{}/retrieve", base), None).unwrap();
        let err = retriever.retrieve("q", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);
    }

    #[tokio::test]
    async fn test_retrieve_server_error_is_unavailable() {
        let router = Router::new().route(
            "/retrieve",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_service(router).await;

        let retriever = HttpRetriever::new(format!("{}/retrieve", base), None).unwrap();
        let err = retriever.retrieve("q", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);
    }

    #[tokio::test]
    async fn test_retrieve_unreachable_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let retriever = HttpRetriever::new(format!("http://{}/retrieve", addr), None).unwrap();
        let err = retriever.retrieve("q", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);
    }

    #[tokio::test]
    async fn test_generate_sends_options_and_token() {
        let router = Router::new().route(
            "/generate",
            post(
                |headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers["authorization"], "Bearer secret");
                    assert_eq!(body["max_tokens"], 256);
                    assert_eq!(body["stop_sequences"][0], "</answer>");
                    assert!(body["prompt"].as_str().unwrap().contains("Is it raining?"));
                    Json(json!({"text": "No."}))
                },
            ),
        );
        let base = spawn_service(router).await;

        let generator = HttpGenerator::new(format!("{}/generate", base), Some("secret")).unwrap();
        let config = GenerationConfig {
            max_tokens: 256,
            stop_sequences: vec!["</answer>".to_string()],
            ..Default::default()
        };

        let text = generator.generate(&prompt("Is it raining?"), &config).await.unwrap();
        assert_eq!(text, "No.");
    }

    #[tokio::test]
    async fn test_generate_rate_limit_is_rejected() {
        let router = Router::new().route(
            "/generate",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_service(router).await;

        let generator = HttpGenerator::new(format!("{}/generate", base), None).unwrap();
        let err = generator
            .generate(&prompt("q"), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationRejected);
    }

    #[tokio::test]
    async fn test_generate_bad_gateway_is_unavailable() {
        let router = Router::new().route(
            "/generate",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn_service(router).await;

        let generator = HttpGenerator::new(format!("{}/generate", base), None).unwrap();
        let err = generator
            .generate(&prompt("q"), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationUnavailable);
    }
}
