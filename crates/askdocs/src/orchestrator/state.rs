//! Per-request state machine
//!
//! `Received -> Retrieving -> Assembling -> Generating -> Completed`, with
//! `Failed` reachable from every non-terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, ErrorKind};

/// Non-terminal stage of a request, reported with failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Received,
    Retrieving,
    Assembling,
    Generating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Retrieving => "retrieving",
            Stage::Assembling => "assembling",
            Stage::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// Why a request failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Stage that was active when the error surfaced
    pub stage: Stage,
    /// Error kind of the underlying error
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl Failure {
    pub fn new(stage: Stage, error: &Error) -> Self {
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// State of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Received,
    Retrieving,
    Assembling,
    Generating,
    Completed,
    Failed(Failure),
}

impl QueryState {
    /// Stage for non-terminal states
    pub fn stage(&self) -> Option<Stage> {
        match self {
            QueryState::Received => Some(Stage::Received),
            QueryState::Retrieving => Some(Stage::Retrieving),
            QueryState::Assembling => Some(Stage::Assembling),
            QueryState::Generating => Some(Stage::Generating),
            QueryState::Completed | QueryState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: &QueryState) -> bool {
        use QueryState::*;
        match (self, next) {
            (Received, Retrieving)
            | (Retrieving, Assembling)
            | (Assembling, Generating)
            | (Generating, Completed) => true,
            (current, Failed(_)) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, logging the transition.
    ///
    /// Illegal transitions are refused and leave the state unchanged.
    pub fn advance(&mut self, next: QueryState) -> bool {
        if !self.can_advance_to(&next) {
            tracing::error!("Illegal state transition {} -> {}", self, next);
            return false;
        }
        tracing::debug!("State {} -> {}", self, next);
        *self = next;
        true
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryState::Completed => f.write_str("completed"),
            QueryState::Failed(failure) => write!(f, "failed({} at {})", failure.kind, failure.stage),
            other => match other.stage() {
                Some(stage) => fmt::Display::fmt(&stage, f),
                None => Ok(()),
            },
        }
    }
}
