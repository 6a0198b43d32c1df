//! Bedrock runtime client for answer generation
//!
//! Sends the assembled prompt as a single user message using the Anthropic
//! messages body, optionally under a guardrail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::BedrockAuth;
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::generation::Prompt;
use crate::providers::{generation_status_error, GenerationProvider};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const GUARDRAIL_ID_HEADER: &str = "X-Amzn-Bedrock-GuardrailIdentifier";
const GUARDRAIL_VERSION_HEADER: &str = "X-Amzn-Bedrock-GuardrailVersion";

/// Guardrail applied to every invocation
#[derive(Debug, Clone)]
pub struct Guardrail {
    pub id: String,
    pub version: String,
}

/// Bedrock runtime generator
pub struct RuntimeGenerator {
    auth: Arc<BedrockAuth>,
    model_id: String,
    guardrail: Option<Guardrail>,
}

impl RuntimeGenerator {
    /// Create a new generator
    ///
    /// # Arguments
    /// * `auth` - Bedrock connection
    /// * `model_id` - Model to invoke (e.g., "anthropic.claude-3-haiku-20240307-v1:0")
    pub fn new(auth: Arc<BedrockAuth>, model_id: String) -> Self {
        Self {
            auth,
            model_id,
            guardrail: None,
        }
    }

    /// Evaluate requests against a guardrail
    pub fn with_guardrail(mut self, id: String, version: String) -> Self {
        self.guardrail = Some(Guardrail { id, version });
        self
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        // Model IDs carry a ':' version suffix which must be escaped in the path
        format!(
            "{}/model/{}/invoke",
            self.auth.runtime_endpoint(),
            self.model_id.replace(':', "%3A")
        )
    }
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(rename = "amazon-bedrock-guardrailAction", default)]
    guardrail_action: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl InvokeResponse {
    fn into_text(self) -> Result<String> {
        if self.guardrail_action.as_deref() == Some("INTERVENED")
            || self.stop_reason.as_deref() == Some("guardrail_intervened")
        {
            return Err(Error::generation_rejected("guardrail intervened"));
        }

        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind.as_deref().map_or(true, |k| k == "text"))
            .filter_map(|block| block.text)
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl GenerationProvider for RuntimeGenerator {
    async fn generate(&self, prompt: &Prompt, config: &GenerationConfig) -> Result<String> {
        let request = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: config.max_tokens,
            system: prompt.system(),
            messages: vec![Message {
                role: "user",
                content: prompt.text(),
            }],
            temperature: config.temperature,
            stop_sequences: &config.stop_sequences,
        };

        let mut builder = self.auth.client().post(self.endpoint()).json(&request);
        if let Some(guardrail) = &self.guardrail {
            builder = builder
                .header(GUARDRAIL_ID_HEADER, &guardrail.id)
                .header(GUARDRAIL_VERSION_HEADER, &guardrail.version);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::generation_unavailable(format!("Bedrock request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(generation_status_error(status, &body));
        }

        let parsed: InvokeResponse = response.json().await.map_err(|e| {
            Error::generation_unavailable(format!("Failed to parse Bedrock response: {}", e))
        })?;

        let text = parsed.into_text()?;
        tracing::info!("Successfully generated text with model {}", self.model_id);
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.auth.region().is_empty())
    }

    fn name(&self) -> &'static str {
        "bedrock-runtime"
    }

    fn model(&self) -> String {
        self.model_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BedrockConfig;
    use crate::error::ErrorKind;
    use crate::generation::{PromptAssembler, PromptTemplate};
    use crate::types::Passage;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn spawn_service(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn generator(base: &str) -> RuntimeGenerator {
        let config = BedrockConfig {
            region: "eu-central-1".to_string(),
            knowledge_base_id: "KB1".to_string(),
            model_id: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            bearer_token: Some("key".to_string()),
            guardrail_id: None,
            guardrail_version: "DRAFT".to_string(),
            search_type: "SEMANTIC".to_string(),
            agent_runtime_endpoint: None,
            runtime_endpoint: Some(base.to_string()),
        };
        let auth = Arc::new(BedrockAuth::from_config(&config).unwrap());
        RuntimeGenerator::new(auth, config.model_id.clone())
    }

    fn prompt() -> Prompt {
        let passages = vec![Passage::new("p1", "Refunds within 30 days.", 0.9, "s3://d/r.pdf")];
        PromptAssembler::new(10_000)
            .assemble("What is the refund policy?", &passages, &PromptTemplate::default(), None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_body_and_guardrail_headers() {
        let router = Router::new().route(
            "/model/:model/invoke",
            post(
                |Path(model): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(model, "anthropic.claude-3-haiku-20240307-v1:0");
                    assert_eq!(headers["authorization"], "Bearer key");
                    assert_eq!(headers["x-amzn-bedrock-guardrailidentifier"], "gr-1");
                    assert_eq!(headers["x-amzn-bedrock-guardrailversion"], "3");
                    assert_eq!(body["anthropic_version"], ANTHROPIC_VERSION);
                    assert_eq!(body["messages"][0]["role"], "user");
                    assert!(body["messages"][0]["content"]
                        .as_str()
                        .unwrap()
                        .contains("What is the refund policy?"));
                    assert!(body["system"].is_string());
                    assert!(body.get("stop_sequences").is_none());
                    Json(json!({
                        "content": [{"type": "text", "text": "Within 30 days [1]."}],
                        "stop_reason": "end_turn"
                    }))
                },
            ),
        );
        let base = spawn_service(router).await;

        let generator = generator(&base).with_guardrail("gr-1".to_string(), "3".to_string());
        let text = generator
            .generate(&prompt(), &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(text, "Within 30 days [1].");
    }

    #[tokio::test]
    async fn test_guardrail_intervention_is_rejected() {
        let router = Router::new().route(
            "/model/:model/invoke",
            post(|| async {
                Json(json!({
                    "content": [{"type": "text", "text": "Sorry, I can't help with that."}],
                    "amazon-bedrock-guardrailAction": "INTERVENED"
                }))
            }),
        );
        let base = spawn_service(router).await;

        let err = generator(&base)
            .generate(&prompt(), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationRejected);
    }

    #[tokio::test]
    async fn test_throttling_is_rejected() {
        let router = Router::new().route(
            "/model/:model/invoke",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, r#"{"message":"ThrottlingException"}"#) }),
        );
        let base = spawn_service(router).await;

        let err = generator(&base)
            .generate(&prompt(), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationRejected);
    }

    #[tokio::test]
    async fn test_model_error_is_unavailable() {
        let router = Router::new().route(
            "/model/:model/invoke",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailableException") }),
        );
        let base = spawn_service(router).await;

        let err = generator(&base)
            .generate(&prompt(), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationUnavailable);
    }
}
