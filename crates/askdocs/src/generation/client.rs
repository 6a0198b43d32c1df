//! Deadline-bounded generation calls

use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::generation::Prompt;
use crate::providers::GenerationProvider;

/// Wraps a generation provider with the per-call deadline and the
/// non-empty-text guarantee
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    /// Generate text for a prompt.
    ///
    /// The provider call is cancelled once `config.timeout_ms` elapses. An
    /// empty completion counts as `GenerationUnavailable`. Non-empty text is
    /// returned exactly as the model produced it.
    pub async fn generate(&self, prompt: &Prompt, config: &GenerationConfig) -> Result<String> {
        let deadline = Duration::from_millis(config.timeout_ms);

        let text = tokio::time::timeout(deadline, self.provider.generate(prompt, config))
            .await
            .map_err(|_| Error::GenerationTimeout(config.timeout_ms))??;

        if text.trim().is_empty() {
            return Err(Error::generation_unavailable("model returned an empty completion"));
        }

        Ok(text)
    }
}
