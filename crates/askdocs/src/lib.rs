//! askdocs: question answering over a document collection
//!
//! A stateless request handler forwards a user question to a semantic
//! retrieval service, assembles the retrieved passages into a prompt and asks
//! a language model for a grounded answer. Retrieval and generation are
//! external services reached over HTTP (plain JSON services or Amazon Bedrock).

pub mod config;
pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::AskDocsConfig;
pub use error::{Error, ErrorKind, Result};
pub use orchestrator::{QueryOrchestrator, Stage};
pub use types::{Answer, AnswerResponse, AnswerStatus, Passage, Query, QueryRequest};
