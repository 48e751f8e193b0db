//! Explicit session phase, derived from the assembled snapshot
//!
//! The phase is a pure function of the resolved session and the turn
//! sequence: turn count plus the role of the last turn. Computing it
//! fresh on every read keeps the state machine honest about what is
//! actually persisted.

use crate::db::{Role, Session, Turn};

/// Where a candidate's interview currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No ongoing session resolves for the candidate: they never
    /// started, or their previous session completed.
    NoSession,
    /// Session created; only the opening system turn is on file.
    AwaitingProfile,
    /// Profile submitted; the next step is generating a question.
    Ready,
    /// A generated question is on file, awaiting an answer.
    QuestionPending,
}

impl SessionPhase {
    /// Derive the phase from a resolved session and its ordered turns.
    pub fn derive(session: Option<&Session>, turns: &[Turn]) -> Self {
        if session.map_or(true, |s| !s.is_ongoing()) {
            return SessionPhase::NoSession;
        }
        match turns.last() {
            Some(last) if turns.len() >= 3 => {
                if last.role == Role::Assistant {
                    SessionPhase::QuestionPending
                } else {
                    SessionPhase::Ready
                }
            }
            _ => SessionPhase::AwaitingProfile,
        }
    }
}
