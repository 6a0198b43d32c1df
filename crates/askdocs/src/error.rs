//! Error types for the question-answering core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::AnswerResponse;

/// Result type alias for askdocs operations
pub type Result<T> = std::result::Result<T, Error>;

/// askdocs errors
#[derive(Debug, Error)]
pub enum Error {
    /// The query (or its retrieval parameters) was rejected at ingress
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Retrieval service unreachable or returned a malformed response
    #[error("Retrieval service unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Retrieval call exceeded its deadline
    #[error("Retrieval timed out after {0}ms")]
    RetrievalTimeout(u64),

    /// Prompt template is missing a required slot
    #[error("Prompt template error: {0}")]
    Template(String),

    /// Generation endpoint unreachable or returned a malformed response
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// Generation call exceeded its deadline
    #[error("Generation timed out after {0}ms")]
    GenerationTimeout(u64),

    /// Generation service refused the request (content policy, rate limit)
    #[error("Generation rejected: {0}")]
    GenerationRejected(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire-level classification of a failed request.
///
/// Serialised as the `error_kind` string of the answer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidQuery,
    RetrievalUnavailable,
    RetrievalTimeout,
    TemplateError,
    GenerationUnavailable,
    GenerationTimeout,
    GenerationRejected,
    Internal,
}

impl ErrorKind {
    /// Whether the orchestrator may retry a call that failed with this kind
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RetrievalUnavailable
                | ErrorKind::RetrievalTimeout
                | ErrorKind::GenerationUnavailable
                | ErrorKind::GenerationTimeout
        )
    }

    /// Wire name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidQuery => "InvalidQuery",
            ErrorKind::RetrievalUnavailable => "RetrievalUnavailable",
            ErrorKind::RetrievalTimeout => "RetrievalTimeout",
            ErrorKind::TemplateError => "TemplateError",
            ErrorKind::GenerationUnavailable => "GenerationUnavailable",
            ErrorKind::GenerationTimeout => "GenerationTimeout",
            ErrorKind::GenerationRejected => "GenerationRejected",
            ErrorKind::Internal => "Internal",
        }
    }

    /// HTTP status used by the answer endpoint for this kind
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidQuery => StatusCode::BAD_REQUEST,
            ErrorKind::RetrievalUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::RetrievalTimeout | ErrorKind::GenerationTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ErrorKind::TemplateError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::GenerationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::GenerationRejected => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Process exit code used by the CLI, one per kind
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::InvalidQuery => 2,
            ErrorKind::RetrievalUnavailable => 10,
            ErrorKind::RetrievalTimeout => 11,
            ErrorKind::TemplateError => 12,
            ErrorKind::GenerationUnavailable => 13,
            ErrorKind::GenerationTimeout => 14,
            ErrorKind::GenerationRejected => 15,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create an invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a retrieval unavailable error
    pub fn retrieval_unavailable(message: impl Into<String>) -> Self {
        Self::RetrievalUnavailable(message.into())
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    /// Create a generation unavailable error
    pub fn generation_unavailable(message: impl Into<String>) -> Self {
        Self::GenerationUnavailable(message.into())
    }

    /// Create a generation rejected error
    pub fn generation_rejected(message: impl Into<String>) -> Self {
        Self::GenerationRejected(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify the error for retry decisions and the wire response
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Error::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            Error::RetrievalTimeout(_) => ErrorKind::RetrievalTimeout,
            Error::Template(_) => ErrorKind::TemplateError,
            Error::GenerationUnavailable(_) => ErrorKind::GenerationUnavailable,
            Error::GenerationTimeout(_) => ErrorKind::GenerationTimeout,
            Error::GenerationRejected(_) => ErrorKind::GenerationRejected,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the failed call may be retried
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors returned by handlers carry the answer body shape, failed at ingress
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("Request rejected: {}", self);
        let body = Json(AnswerResponse::rejected(&self));
        (self.kind().status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::RetrievalTimeout(100).is_retryable());
        assert!(Error::retrieval_unavailable("down").is_retryable());
        assert!(Error::GenerationTimeout(100).is_retryable());
        assert!(Error::generation_unavailable("down").is_retryable());

        assert!(!Error::generation_rejected("policy").is_retryable());
        assert!(!Error::template("missing {passages}").is_retryable());
        assert!(!Error::invalid_query("empty").is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidQuery,
            ErrorKind::RetrievalUnavailable,
            ErrorKind::RetrievalTimeout,
            ErrorKind::TemplateError,
            ErrorKind::GenerationUnavailable,
            ErrorKind::GenerationTimeout,
            ErrorKind::GenerationRejected,
            ErrorKind::Internal,
        ];
        let codes: std::collections::HashSet<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_kind_serializes_as_wire_name() {
        let json = serde_json::to_string(&ErrorKind::GenerationRejected).unwrap();
        assert_eq!(json, "\"GenerationRejected\"");
        assert_eq!(Error::template("x").kind().as_str(), "TemplateError");
    }
}
