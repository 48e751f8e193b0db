//! Error taxonomy for interview operations

use crate::db::DbError;
use crate::llm::LlmError;
use thiserror::Error;

/// Why the state machine refused an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionBlock {
    /// No ongoing session resolves for the candidate.
    NoActiveSession,
    /// A session exists but its turn sequence has the wrong shape for
    /// the requested operation.
    WrongShape,
}

#[derive(Debug, Error)]
pub enum InterviewError {
    /// Malformed input, rejected before any state is touched.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The operation is illegal in the session's current phase. No state
    /// was mutated.
    #[error("{message}")]
    InvalidTransition {
        block: TransitionBlock,
        message: String,
    },

    /// The underlying store failed. Turn appends are transactional
    /// batches, so a session is never left half-updated.
    #[error("persistence failure: {0}")]
    Persistence(#[from] DbError),

    /// The language model could not produce a response.
    #[error("language model unavailable: {0}")]
    ModelUnavailable(#[from] LlmError),
}

impl InterviewError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn no_active_session() -> Self {
        Self::InvalidTransition {
            block: TransitionBlock::NoActiveSession,
            message: "no active interview session for this candidate".to_string(),
        }
    }

    pub fn wrong_shape(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            block: TransitionBlock::WrongShape,
            message: message.into(),
        }
    }
}

pub type InterviewResult<T> = Result<T, InterviewError>;
