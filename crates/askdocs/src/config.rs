//! Configuration for the question-answering service
//!
//! One immutable [`AskDocsConfig`] is built at startup (TOML file, then
//! `ASKDOCS_*` environment overrides) and shared behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generation::PromptTemplate;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ASKDOCS_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AskDocsConfig {
    /// Backend provider (http or bedrock)
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// Plain HTTP service endpoints (used when backend = http)
    pub http: HttpBackendConfig,
    /// Bedrock configuration (required when backend = bedrock)
    pub bedrock: Option<BedrockConfig>,
    /// Retrieval limits and filtering
    pub retrieval: RetrievalConfig,
    /// Prompt template and size limit
    pub prompt: PromptConfig,
    /// Generation options
    pub generation: GenerationConfig,
    /// Retry policy for retryable failures
    pub retry: RetryConfig,
    /// How cited passages are presented to callers
    pub references: ReferenceConfig,
}

impl AskDocsConfig {
    /// Load configuration from a TOML file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        tracing::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text (no overrides, no validation)
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Resolve configuration the way the binaries do:
    /// `$ASKDOCS_CONFIG`, then `<config dir>/askdocs/config.toml`, then defaults
    pub fn from_env_or_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(path);
        }

        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("askdocs").join("config.toml"))
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Environment values win over the file, as the deployment sets them per stage.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ASKDOCS_RETRIEVAL_URL") {
            self.http.retrieval_url = url;
        }
        if let Some(url) = lookup("ASKDOCS_GENERATION_URL") {
            self.http.generation_url = url;
        }
        if let Some(token) = lookup("ASKDOCS_BEARER_TOKEN") {
            self.http.bearer_token = Some(token);
        }

        if let Some(bedrock) = self.bedrock.as_mut() {
            if let Some(region) = lookup("ASKDOCS_AWS_REGION").or_else(|| lookup("AWS_REGION")) {
                bedrock.region = region;
            }
            if let Some(kb) = lookup("ASKDOCS_KNOWLEDGE_BASE_ID") {
                bedrock.knowledge_base_id = kb;
            }
            if let Some(model) = lookup("ASKDOCS_MODEL_ID") {
                bedrock.model_id = model;
            }
            if let Some(token) = lookup("AWS_BEARER_TOKEN_BEDROCK") {
                bedrock.bearer_token = Some(token);
            }
        }

        if let Some(port) = lookup("ASKDOCS_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject inconsistent settings before anything is constructed from them
    pub fn validate(&self) -> Result<()> {
        let retrieval = &self.retrieval;
        if retrieval.max_top_k == 0 {
            return Err(Error::Config("retrieval.max_top_k must be at least 1".into()));
        }
        if retrieval.default_top_k == 0 || retrieval.default_top_k > retrieval.max_top_k {
            return Err(Error::Config(format!(
                "retrieval.default_top_k must be in 1..={}",
                retrieval.max_top_k
            )));
        }
        if let Some(cutoff) = retrieval.relative_cutoff {
            if !(0.0..=1.0).contains(&cutoff) {
                return Err(Error::Config(
                    "retrieval.relative_cutoff must be between 0.0 and 1.0".into(),
                ));
            }
        }
        if retrieval.timeout_ms == 0 || self.generation.timeout_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config("retry.backoff_multiplier must be >= 1.0".into()));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::Config("generation.max_tokens must be at least 1".into()));
        }

        self.prompt.template.validate()?;

        match self.backend {
            BackendProvider::Http => {
                if self.http.retrieval_url.is_empty() || self.http.generation_url.is_empty() {
                    return Err(Error::Config(
                        "http backend requires http.retrieval_url and http.generation_url".into(),
                    ));
                }
            }
            BackendProvider::Bedrock => {
                let bedrock = self.bedrock.as_ref().ok_or_else(|| {
                    Error::Config("Bedrock backend selected but bedrock config is missing".into())
                })?;
                if bedrock.knowledge_base_id.is_empty() || bedrock.model_id.is_empty() {
                    return Err(Error::Config(
                        "bedrock.knowledge_base_id and bedrock.model_id are required".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Generic JSON services speaking the retrieval/generation contracts
    #[default]
    Http,
    /// Bedrock knowledge base + Bedrock runtime
    Bedrock,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 64 * 1024,
        }
    }
}

/// Endpoints for the plain HTTP backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    /// Retrieval service URL (`POST {query, top_k}`)
    pub retrieval_url: String,
    /// Generation service URL (`POST {prompt, temperature, max_tokens, stop_sequences}`)
    pub generation_url: String,
    /// Optional bearer token sent to both services
    pub bearer_token: Option<String>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            retrieval_url: "http://localhost:9001/retrieve".to_string(),
            generation_url: "http://localhost:9002/generate".to_string(),
            bearer_token: None,
        }
    }
}

/// Bedrock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockConfig {
    /// AWS region (e.g., "eu-central-1")
    #[serde(default = "default_region")]
    pub region: String,
    /// Knowledge base ID used for retrieval
    pub knowledge_base_id: String,
    /// Model ID used for generation
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Bedrock API key (bearer token)
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Guardrail applied to generation requests
    #[serde(default)]
    pub guardrail_id: Option<String>,
    /// Guardrail version (default: "DRAFT")
    #[serde(default = "default_guardrail_version")]
    pub guardrail_version: String,
    /// Knowledge base search type override (default: "SEMANTIC")
    #[serde(default = "default_search_type")]
    pub search_type: String,
    /// Override for the agent-runtime endpoint (tests, VPC endpoints)
    #[serde(default)]
    pub agent_runtime_endpoint: Option<String>,
    /// Override for the runtime endpoint (tests, VPC endpoints)
    #[serde(default)]
    pub runtime_endpoint: Option<String>,
}

fn default_region() -> String {
    "eu-central-1".to_string()
}

fn default_model_id() -> String {
    "anthropic.claude-3-haiku-20240307-v1:0".to_string()
}

fn default_guardrail_version() -> String {
    "DRAFT".to_string()
}

fn default_search_type() -> String {
    "SEMANTIC".to_string()
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages requested when the caller does not say
    pub default_top_k: usize,
    /// Upper bound on `top_k`, keeps prompt size bounded
    pub max_top_k: usize,
    /// Passages scoring below this are dropped
    pub min_score: f32,
    /// Drop passages scoring at or below `top_score * relative_cutoff`
    pub relative_cutoff: Option<f32>,
    /// Deadline for one retrieval call in milliseconds
    pub timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 10,
            min_score: 0.0,
            relative_cutoff: None,
            timeout_ms: 10_000,
        }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Instruction template with `{question}` and `{passages}` slots
    pub template: PromptTemplate,
    /// Maximum assembled prompt length in characters
    pub max_prompt_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: PromptTemplate::default(),
            max_prompt_chars: 24_000,
        }
    }
}

/// Options forwarded to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Randomness of output
    pub temperature: f32,
    /// Cap on generated length
    pub max_tokens: u32,
    /// Strings that end generation early
    pub stop_sequences: Vec<String>,
    /// Deadline for one generation call in milliseconds
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2048,
            stop_sequences: Vec::new(),
            timeout_ms: 60_000,
        }
    }
}

/// Retry policy for timeouts and unavailability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per external call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,
    /// Growth factor between retries
    pub backoff_multiplier: f64,
    /// Ceiling on a single delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

/// Presentation of referenced documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Source prefix to rewrite (e.g., "s3://my-docs-bucket/")
    pub source_prefix: Option<String>,
    /// Public base URL replacing `source_prefix`
    pub document_base_url: Option<String>,
}
