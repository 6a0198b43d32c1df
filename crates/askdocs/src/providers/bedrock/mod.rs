//! Amazon Bedrock provider implementations
//!
//! - Knowledge base `Retrieve` for semantic passage search
//! - Runtime `InvokeModel` (Anthropic messages body) for answer generation
//!
//! Requests authenticate with a Bedrock API key sent as a bearer token.

mod auth;
mod knowledge_base;
mod runtime;

pub use auth::BedrockAuth;
pub use knowledge_base::KnowledgeBaseRetriever;
pub use runtime::RuntimeGenerator;
