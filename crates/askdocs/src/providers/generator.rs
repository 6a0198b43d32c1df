//! Generation provider trait for language-model endpoints

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::generation::Prompt;

/// Trait for language-model text generation
///
/// Implementations:
/// - `HttpGenerator`: JSON service taking `{prompt, temperature, max_tokens, stop_sequences}`
/// - `RuntimeGenerator`: Bedrock runtime (Anthropic messages body)
///
/// Implementations must keep the three failure kinds apart:
/// `GenerationUnavailable`, `GenerationRejected` (policy, throttling) and,
/// where the service itself reports one, `GenerationTimeout`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for an assembled prompt
    async fn generate(&self, prompt: &Prompt, config: &GenerationConfig) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &'static str;

    /// Get the model being used
    fn model(&self) -> String;
}
