//! Core types for the question-answering flow

pub mod answer;
pub mod passage;
pub mod query;

pub use answer::{Answer, AnswerResponse, AnswerStatus, ReferencedDocument};
pub use passage::Passage;
pub use query::{ConversationTurn, Query, QueryRequest};
