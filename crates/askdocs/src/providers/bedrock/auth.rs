//! Bedrock endpoints and authenticated HTTP client

use reqwest::Client;

use crate::config::BedrockConfig;
use crate::error::{Error, Result};
use crate::providers::build_client;

/// Shared Bedrock connection settings
pub struct BedrockAuth {
    client: Client,
    region: String,
    runtime_endpoint: String,
    agent_runtime_endpoint: String,
}

impl BedrockAuth {
    /// Build from configuration
    pub fn from_config(config: &BedrockConfig) -> Result<Self> {
        if config.region.is_empty() {
            return Err(Error::Config("bedrock.region must not be empty".into()));
        }
        if config.bearer_token.is_none() {
            tracing::warn!("No Bedrock API key configured; requests will be unauthenticated");
        }

        let runtime_endpoint = config
            .runtime_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", config.region));
        let agent_runtime_endpoint = config.agent_runtime_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", config.region)
        });

        Ok(Self {
            client: build_client(config.bearer_token.as_deref())?,
            region: config.region.clone(),
            runtime_endpoint: runtime_endpoint.trim_end_matches('/').to_string(),
            agent_runtime_endpoint: agent_runtime_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// HTTP client carrying the authorization header
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// AWS region
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Base URL for `InvokeModel`
    pub fn runtime_endpoint(&self) -> &str {
        &self.runtime_endpoint
    }

    /// Base URL for knowledge base `Retrieve`
    pub fn agent_runtime_endpoint(&self) -> &str {
        &self.agent_runtime_endpoint
    }
}
