//! Context assembly: the read side of every operation
//!
//! Assembly is a pure read composition with no side effects. It is the
//! only way operations observe session state, which forces every
//! decision through the store rather than through process memory.

use super::error::InterviewError;
use super::phase::SessionPhase;
use crate::db::{Database, DbResult, Session, Turn};

/// Snapshot of a candidate's conversational state
#[derive(Debug)]
pub struct Assembled {
    /// The ongoing session, if one resolves.
    pub session: Option<Session>,
    /// Its turns in sequence order; empty when `session` is `None`.
    pub turns: Vec<Turn>,
}

impl Assembled {
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::derive(self.session.as_ref(), &self.turns)
    }

    /// The ongoing session, or the no-active-session rejection.
    pub fn active_session(&self) -> Result<&Session, InterviewError> {
        self.session
            .as_ref()
            .ok_or_else(InterviewError::no_active_session)
    }
}

/// Resolve the candidate's current session and load its turns in order.
///
/// A candidate whose latest session is completed has no active session:
/// the snapshot comes back empty, exactly as for a candidate who never
/// started.
pub fn assemble(db: &Database, candidate_id: &str) -> DbResult<Assembled> {
    match db.find_latest_session(candidate_id)? {
        Some(session) if session.is_ongoing() => {
            let turns = db.list_turns(&session.id)?;
            Ok(Assembled {
                session: Some(session),
                turns,
            })
        }
        _ => Ok(Assembled {
            session: None,
            turns: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TurnDraft;

    #[test]
    fn test_assemble_without_session() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = assemble(&db, "a@x.com").unwrap();
        assert!(snapshot.session.is_none());
        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.phase(), SessionPhase::NoSession);
    }

    #[test]
    fn test_assemble_loads_turns_in_order() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("a@x.com").unwrap();
        db.append_turns(
            &session.id,
            &[
                TurnDraft::system("sys"),
                TurnDraft::user("resume: r"),
                TurnDraft::user("JD: jd"),
            ],
        )
        .unwrap();

        let snapshot = assemble(&db, "a@x.com").unwrap();
        assert_eq!(snapshot.session.as_ref().unwrap().id, session.id);
        let contents: Vec<&str> = snapshot.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "resume: r", "JD: jd"]);
        assert_eq!(snapshot.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_completed_session_assembles_as_absent() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("a@x.com").unwrap();
        db.append_turns(&session.id, &[TurnDraft::system("sys")])
            .unwrap();
        db.complete_session(&session.id, "feedback").unwrap();

        let snapshot = assemble(&db, "a@x.com").unwrap();
        assert!(snapshot.session.is_none());
        assert!(snapshot.turns.is_empty());
    }
}
