//! Query request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prior question/answer exchange in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Answer endpoint request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    #[serde(alias = "question")]
    pub query: String,

    /// Extra instructions for the model (fills the `{instructions}` slot)
    #[serde(default)]
    pub instructions: Option<String>,

    /// Number of passages to retrieve (defaults to the configured value)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Conversation this question belongs to (accepted, not yet used)
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Prior turns of the conversation (accepted, not yet used)
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl QueryRequest {
    /// Create a new request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            instructions: None,
            top_k: None,
            conversation_id: None,
            history: Vec::new(),
        }
    }

    /// Set the number of passages to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set model instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Attach the request to a conversation
    pub fn with_conversation(
        mut self,
        conversation_id: impl Into<String>,
        history: Vec<ConversationTurn>,
    ) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self.history = history;
        self
    }
}

/// A received question. Immutable once created.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    instructions: Option<String>,
    top_k: Option<usize>,
    conversation_id: Option<String>,
    history: Vec<ConversationTurn>,
    received_at: DateTime<Utc>,
}

impl Query {
    /// Create a query from plain text
    pub fn new(text: impl Into<String>) -> Self {
        Self::from(QueryRequest::new(text))
    }

    /// Text exactly as submitted
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Requested passage count, if the caller set one
    pub fn top_k(&self) -> Option<usize> {
        self.top_k
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Ingress time, recorded on the request span
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl From<QueryRequest> for Query {
    fn from(request: QueryRequest) -> Self {
        Self {
            text: request.query,
            instructions: request.instructions.filter(|i| !i.trim().is_empty()),
            top_k: request.top_k,
            conversation_id: request.conversation_id,
            history: request.history,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_question_alias() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "What is the refund policy?"}"#).unwrap();
        assert_eq!(request.query, "What is the refund policy?");
        assert!(request.history.is_empty());
        assert!(request.conversation_id.is_none());
    }

    #[test]
    fn test_request_with_conversation_fields() {
        let request: QueryRequest = serde_json::from_str(
            r#"{
                "query": "And for digital goods?",
                "conversation_id": "c-42",
                "history": [{"question": "What is the refund policy?", "answer": "30 days."}]
            }"#,
        )
        .unwrap();

        let query = Query::from(request);
        assert_eq!(query.conversation_id(), Some("c-42"));
        assert_eq!(query.history().len(), 1);
    }

    #[test]
    fn test_query_keeps_text_verbatim() {
        let query = Query::new("  spaced question?  ");
        assert_eq!(query.text(), "  spaced question?  ");
        assert!(query.received_at() <= Utc::now());
    }

    #[test]
    fn test_blank_instructions_dropped() {
        let query = Query::from(QueryRequest::new("q").with_instructions("   "));
        assert!(query.instructions().is_none());
    }
}
