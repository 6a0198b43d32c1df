//! Answer types and the answer endpoint response body

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, ErrorKind};
use crate::orchestrator::{Failure, QueryState, Stage};

/// Outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Ok,
    Error,
}

/// A source document referenced by an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencedDocument {
    /// Passage ID
    pub id: String,
    /// Source reference as returned by retrieval
    pub source: String,
    /// Short title for display
    pub display_title: String,
    /// Public URL, when a base URL is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    /// Relevance score
    pub score: f32,
}

/// Result of handling one query
#[derive(Debug, Clone)]
pub struct Answer {
    /// Per-request identifier (also on the tracing span)
    pub request_id: Uuid,
    pub status: AnswerStatus,
    /// Generated text; empty when the request failed
    pub text: String,
    /// IDs of the passages embedded in the prompt, relevance-descending
    pub citations: Vec<String>,
    /// Display data for the cited passages
    pub references: Vec<ReferencedDocument>,
    /// Set when `status` is `Error`
    pub failure: Option<Failure>,
    /// Echoed from the request
    pub conversation_id: Option<String>,
    /// Final state: `Completed`, or `Failed` with the stage and error kind
    pub state: QueryState,
    /// Passages returned by retrieval
    pub passages_retrieved: usize,
    /// Passages dropped to fit the prompt size limit
    pub passages_dropped: usize,
    pub retrieval_attempts: u32,
    pub generation_attempts: u32,
    pub processing_time_ms: u64,
}

impl Answer {
    pub fn is_ok(&self) -> bool {
        self.status == AnswerStatus::Ok
    }

    /// Error kind of a failed answer
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    /// Stage at which a failed answer stopped
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failure.as_ref().map(|f| f.stage)
    }
}

/// Answer endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub citations: Vec<String>,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub references: Vec<ReferencedDocument>,
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub processing_time_ms: u64,
}

impl From<&Answer> for AnswerResponse {
    fn from(answer: &Answer) -> Self {
        Self {
            answer: answer.text.clone(),
            citations: answer.citations.clone(),
            status: answer.status,
            error_kind: answer.error_kind(),
            failed_stage: answer.failed_stage(),
            message: answer.failure.as_ref().map(|f| f.message.clone()),
            references: answer.references.clone(),
            request_id: answer.request_id,
            conversation_id: answer.conversation_id.clone(),
            processing_time_ms: answer.processing_time_ms,
        }
    }
}

impl AnswerResponse {
    /// Body for a request refused before it reached the orchestrator
    pub fn rejected(error: &Error) -> Self {
        Self {
            answer: String::new(),
            citations: Vec::new(),
            status: AnswerStatus::Error,
            error_kind: Some(error.kind()),
            failed_stage: Some(Stage::Received),
            message: Some(error.to_string()),
            references: Vec::new(),
            request_id: Uuid::new_v4(),
            conversation_id: None,
            processing_time_ms: 0,
        }
    }
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self::from(&answer)
    }
}
