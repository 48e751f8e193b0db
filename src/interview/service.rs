//! Interview lifecycle operations
//!
//! Each operation validates its input, serializes on the candidate,
//! assembles a fresh snapshot from storage, checks the phase, and only
//! then mutates. Turn appends are atomic batches, and any append that
//! depends on a model response happens strictly after that response
//! arrives, so a failed model call leaves the turn sequence untouched.

use super::context::assemble;
use super::error::{InterviewError, InterviewResult};
use super::phase::SessionPhase;
use crate::db::{Database, TurnDraft};
use crate::llm::LlmService;
use crate::system_prompt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Turns on file once a full question/answer exchange has happened:
/// system prompt, resume, job description, question, answer.
const FIRST_EXCHANGE_TURNS: usize = 5;

/// Outcome of [`InterviewService::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    /// `false` means an active session already existed and the caller
    /// should resume it instead of submitting a profile again.
    pub created_new_session: bool,
}

/// The interview state machine
pub struct InterviewService {
    db: Database,
    model: Arc<dyn LlmService>,
    /// Per-candidate locks serializing state-changing operations, so
    /// two racing requests cannot both observe the same phase and
    /// append conflicting turns.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InterviewService {
    pub fn new(db: Database, model: Arc<dyn LlmService>) -> Self {
        Self {
            db,
            model,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn candidate_lock(&self, candidate_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(candidate_id.to_string())
            .or_default()
            .clone()
    }

    /// Begin an interview, or resume the candidate's active session.
    ///
    /// Creates a session with its opening system turn only when no
    /// active session resolves; otherwise reports `created_new_session:
    /// false` without mutating anything, so repeated calls are safe.
    pub async fn start(&self, candidate_id: &str) -> InterviewResult<StartOutcome> {
        let candidate_id = validate_candidate_id(candidate_id)?;
        let lock = self.candidate_lock(candidate_id);
        let _guard = lock.lock().await;

        let snapshot = assemble(&self.db, candidate_id)?;
        if snapshot.phase() != SessionPhase::NoSession {
            tracing::debug!(candidate = %candidate_id, "resuming existing session");
            return Ok(StartOutcome {
                created_new_session: false,
            });
        }

        let session = self.db.create_session(candidate_id)?;
        self.db.append_turns(
            &session.id,
            &[TurnDraft::system(system_prompt::INTERVIEWER_PROMPT)],
        )?;

        tracing::info!(candidate = %candidate_id, session = %session.id, "interview session created");
        Ok(StartOutcome {
            created_new_session: true,
        })
    }

    /// Attach the candidate's resume and the job description.
    ///
    /// Legal only while the session holds exactly the opening system
    /// turn. The resume lands before the job description; later
    /// operations are validated against those positions.
    pub async fn submit_profile(
        &self,
        candidate_id: &str,
        job_description: &str,
        resume: &str,
    ) -> InterviewResult<()> {
        let candidate_id = validate_candidate_id(candidate_id)?;
        validate_text("jobDescription", job_description)?;
        validate_text("resume", resume)?;
        let lock = self.candidate_lock(candidate_id);
        let _guard = lock.lock().await;

        let snapshot = assemble(&self.db, candidate_id)?;
        let session_id = snapshot.active_session()?.id.clone();
        if snapshot.turns.len() != 1 {
            return Err(InterviewError::wrong_shape(
                "profile already submitted for this session",
            ));
        }

        self.db.append_turns(
            &session_id,
            &[
                TurnDraft::user(system_prompt::resume_turn(resume)),
                TurnDraft::user(system_prompt::jd_turn(job_description)),
            ],
        )?;
        Ok(())
    }

    /// Generate the next interview question, or hand back the one that
    /// is already pending.
    ///
    /// When the last turn is an unanswered assistant question this is a
    /// pure re-read: no model call, no append. That makes client retries
    /// safe against duplicate generation.
    pub async fn request_question(&self, candidate_id: &str) -> InterviewResult<String> {
        let candidate_id = validate_candidate_id(candidate_id)?;
        let lock = self.candidate_lock(candidate_id);
        let _guard = lock.lock().await;

        let snapshot = assemble(&self.db, candidate_id)?;
        let session_id = snapshot.active_session()?.id.clone();
        match snapshot.phase() {
            SessionPhase::QuestionPending => {
                tracing::debug!(candidate = %candidate_id, "returning pending question");
                let question = snapshot
                    .turns
                    .last()
                    .map(|t| t.content.clone())
                    .unwrap_or_default();
                Ok(question)
            }
            SessionPhase::Ready => {
                let question = self
                    .model
                    .generate(&snapshot.turns, system_prompt::QUESTION_DIRECTIVE)
                    .await?;
                self.db
                    .append_turns(&session_id, &[TurnDraft::assistant(question.clone())])?;
                Ok(question)
            }
            _ => Err(InterviewError::wrong_shape(
                "profile must be submitted before requesting a question",
            )),
        }
    }

    /// Record the candidate's answer and return an ephemeral critique.
    ///
    /// The answer is persisted; the critique is not. Keeping the
    /// model's commentary out of the durable context means future calls
    /// see only question/answer pairs.
    pub async fn submit_answer(&self, candidate_id: &str, answer: &str) -> InterviewResult<String> {
        let candidate_id = validate_candidate_id(candidate_id)?;
        validate_text("answer", answer)?;
        let lock = self.candidate_lock(candidate_id);
        let _guard = lock.lock().await;

        let snapshot = assemble(&self.db, candidate_id)?;
        let session_id = snapshot.active_session()?.id.clone();
        if snapshot.phase() != SessionPhase::QuestionPending {
            return Err(InterviewError::wrong_shape(
                "no question is awaiting an answer",
            ));
        }

        let appended = self
            .db
            .append_turns(&session_id, &[TurnDraft::user(answer)])?;

        let mut turns = snapshot.turns;
        turns.extend(appended);
        let critique = self
            .model
            .generate(&turns, system_prompt::CRITIQUE_DIRECTIVE)
            .await?;
        Ok(critique)
    }

    /// Close the interview with final hire/no-hire feedback.
    ///
    /// Requires at least one full question/answer exchange. Completion
    /// happens exactly once: afterwards the session no longer resolves
    /// as active, so a repeated call is rejected.
    pub async fn end_interview(&self, candidate_id: &str) -> InterviewResult<String> {
        let candidate_id = validate_candidate_id(candidate_id)?;
        let lock = self.candidate_lock(candidate_id);
        let _guard = lock.lock().await;

        let snapshot = assemble(&self.db, candidate_id)?;
        let session_id = snapshot.active_session()?.id.clone();
        if snapshot.turns.len() < FIRST_EXCHANGE_TURNS {
            return Err(InterviewError::wrong_shape(
                "at least one full question and answer is required before ending",
            ));
        }

        let feedback = self
            .model
            .generate(&snapshot.turns, system_prompt::FEEDBACK_DIRECTIVE)
            .await?;
        self.db.complete_session(&session_id, &feedback)?;

        tracing::info!(candidate = %candidate_id, session = %session_id, "interview completed");
        Ok(feedback)
    }
}

/// Candidate identifiers are opaque in storage but must look like an
/// email address at the boundary.
fn validate_candidate_id(raw: &str) -> InterviewResult<&str> {
    let id = raw.trim();
    let well_formed = id
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed {
        return Err(InterviewError::validation(
            "candidateId must be an email address",
        ));
    }
    Ok(id)
}

fn validate_text(field: &str, value: &str) -> InterviewResult<()> {
    if value.trim().is_empty() {
        return Err(InterviewError::validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::error::TransitionBlock;
    use super::super::testing::MockModel;
    use crate::db::{Role, SessionStatus};
    use crate::system_prompt::{
        CRITIQUE_DIRECTIVE, FEEDBACK_DIRECTIVE, QUESTION_DIRECTIVE,
    };

    const CANDIDATE: &str = "a@x.com";

    fn harness() -> (InterviewService, Arc<MockModel>, Database) {
        let db = Database::open_in_memory().unwrap();
        let model = Arc::new(MockModel::new());
        let service = InterviewService::new(db.clone(), model.clone());
        (service, model, db)
    }

    fn turns_for(db: &Database, candidate: &str) -> Vec<crate::db::Turn> {
        let session = db.find_latest_session(candidate).unwrap().unwrap();
        db.list_turns(&session.id).unwrap()
    }

    async fn advance_to_question_pending(
        service: &InterviewService,
        model: &MockModel,
    ) -> String {
        service.start(CANDIDATE).await.unwrap();
        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();
        model.queue("Q1");
        service.request_question(CANDIDATE).await.unwrap()
    }

    #[tokio::test]
    async fn test_start_creates_session_with_system_turn() {
        let (service, _model, db) = harness();

        let outcome = service.start(CANDIDATE).await.unwrap();
        assert!(outcome.created_new_session);

        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].seq, 0);
        assert_eq!(turns[0].role, Role::System);
        assert!(turns[0].content.contains("80%"));
    }

    #[tokio::test]
    async fn test_start_twice_resumes_without_mutation() {
        let (service, _model, db) = harness();

        assert!(service.start(CANDIDATE).await.unwrap().created_new_session);
        assert!(!service.start(CANDIDATE).await.unwrap().created_new_session);

        assert_eq!(turns_for(&db, CANDIDATE).len(), 1);
    }

    #[tokio::test]
    async fn test_submit_profile_appends_resume_then_jd() {
        let (service, _model, db) = harness();

        service.start(CANDIDATE).await.unwrap();
        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();

        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "resume: Resume1");
        assert_eq!(turns[2].role, Role::User);
        assert_eq!(turns[2].content, "JD: JD1");
    }

    #[tokio::test]
    async fn test_submit_profile_without_start_is_rejected() {
        let (service, _model, _db) = harness();

        let err = service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::NoActiveSession,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_submit_profile_twice_is_rejected() {
        let (service, _model, db) = harness();

        service.start(CANDIDATE).await.unwrap();
        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();

        let err = service
            .submit_profile(CANDIDATE, "JD2", "Resume2")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::WrongShape,
                ..
            }
        ));
        assert_eq!(turns_for(&db, CANDIDATE).len(), 3);
    }

    #[tokio::test]
    async fn test_request_question_generates_and_persists() {
        let (service, model, db) = harness();

        let question = advance_to_question_pending(&service, &model).await;
        assert_eq!(question, "Q1");

        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[3].role, Role::Assistant);
        assert_eq!(turns[3].content, "Q1");

        // The model saw the three profile turns plus the directive.
        let calls = model.calls();
        assert_eq!(calls, vec![(3, QUESTION_DIRECTIVE.to_string())]);
    }

    #[tokio::test]
    async fn test_request_question_retry_returns_pending_question() {
        let (service, model, db) = harness();

        let first = advance_to_question_pending(&service, &model).await;
        let second = service.request_question(CANDIDATE).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(turns_for(&db, CANDIDATE).len(), 4);
        assert_eq!(model.calls().len(), 1, "retry must not hit the model");
    }

    #[tokio::test]
    async fn test_request_question_before_profile_is_rejected() {
        let (service, model, db) = harness();

        service.start(CANDIDATE).await.unwrap();
        let err = service.request_question(CANDIDATE).await.unwrap_err();

        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::WrongShape,
                ..
            }
        ));
        assert_eq!(turns_for(&db, CANDIDATE).len(), 1);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_answer_persists_answer_not_critique() {
        let (service, model, db) = harness();

        advance_to_question_pending(&service, &model).await;
        model.queue("Decent answer, light on detail");
        let critique = service.submit_answer(CANDIDATE, "My answer").await.unwrap();
        assert_eq!(critique, "Decent answer, light on detail");

        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[4].role, Role::User);
        assert_eq!(turns[4].content, "My answer");

        // The critique call saw the answer it was critiquing.
        let calls = model.calls();
        assert_eq!(calls[1], (5, CRITIQUE_DIRECTIVE.to_string()));
    }

    #[tokio::test]
    async fn test_submit_answer_twice_is_rejected() {
        let (service, model, db) = harness();

        advance_to_question_pending(&service, &model).await;
        model.queue("critique");
        service.submit_answer(CANDIDATE, "My answer").await.unwrap();

        let err = service
            .submit_answer(CANDIDATE, "Another answer")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::WrongShape,
                ..
            }
        ));
        assert_eq!(turns_for(&db, CANDIDATE).len(), 5);
    }

    #[tokio::test]
    async fn test_submit_answer_without_question_is_rejected() {
        let (service, _model, _db) = harness();

        service.start(CANDIDATE).await.unwrap();
        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();

        let err = service.submit_answer(CANDIDATE, "answer").await.unwrap_err();
        assert!(matches!(err, InterviewError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_end_interview_completes_exactly_once() {
        let (service, model, db) = harness();

        advance_to_question_pending(&service, &model).await;
        model.queue("critique");
        service.submit_answer(CANDIDATE, "My answer").await.unwrap();

        model.queue("Hire: 4 of 5 answered correctly");
        let feedback = service.end_interview(CANDIDATE).await.unwrap();
        assert_eq!(feedback, "Hire: 4 of 5 answered correctly");

        let session = db.find_latest_session(CANDIDATE).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.feedback.as_deref(), Some(feedback.as_str()));
        assert_eq!(db.list_turns(&session.id).unwrap().len(), 5);

        // A completed session no longer resolves as active.
        let err = service.end_interview(CANDIDATE).await.unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::NoActiveSession,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_end_interview_requires_full_exchange() {
        let (service, model, _db) = harness();

        advance_to_question_pending(&service, &model).await;

        // Four turns on file: question asked but never answered.
        let err = service.end_interview(CANDIDATE).await.unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                block: TransitionBlock::WrongShape,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_start_after_completion_opens_fresh_session() {
        let (service, model, db) = harness();

        advance_to_question_pending(&service, &model).await;
        model.queue("critique");
        service.submit_answer(CANDIDATE, "My answer").await.unwrap();
        model.queue("feedback");
        service.end_interview(CANDIDATE).await.unwrap();

        let outcome = service.start(CANDIDATE).await.unwrap();
        assert!(outcome.created_new_session);
        assert_eq!(turns_for(&db, CANDIDATE).len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_turns_unchanged() {
        let (service, model, db) = harness();

        service.start(CANDIDATE).await.unwrap();
        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();

        model.queue_error(crate::llm::LlmError::server_error("overloaded"));
        let err = service.request_question(CANDIDATE).await.unwrap_err();
        assert!(matches!(err, InterviewError::ModelUnavailable(_)));

        // The failed call appended nothing; a later retry succeeds.
        assert_eq!(turns_for(&db, CANDIDATE).len(), 3);
        model.queue("Q1");
        assert_eq!(service.request_question(CANDIDATE).await.unwrap(), "Q1");
    }

    #[tokio::test]
    async fn test_validation_rejects_before_touching_state() {
        let (service, _model, db) = harness();

        let err = service.start("not-an-email").await.unwrap_err();
        assert!(matches!(err, InterviewError::Validation(_)));
        assert!(db.find_latest_session("not-an-email").unwrap().is_none());

        service.start(CANDIDATE).await.unwrap();
        let err = service.submit_profile(CANDIDATE, "", "Resume1").await.unwrap_err();
        assert!(matches!(err, InterviewError::Validation(_)));
        assert_eq!(turns_for(&db, CANDIDATE).len(), 1);

        let err = service.submit_answer(CANDIDATE, "   ").await.unwrap_err();
        assert!(matches!(err, InterviewError::Validation(_)));
    }

    #[tokio::test]
    async fn test_full_interview_scenario() {
        let (service, model, db) = harness();

        assert!(service.start(CANDIDATE).await.unwrap().created_new_session);
        assert_eq!(turns_for(&db, CANDIDATE).len(), 1);

        service
            .submit_profile(CANDIDATE, "JD1", "Resume1")
            .await
            .unwrap();
        assert_eq!(turns_for(&db, CANDIDATE).len(), 3);

        model.queue("Q1");
        assert_eq!(service.request_question(CANDIDATE).await.unwrap(), "Q1");
        assert_eq!(turns_for(&db, CANDIDATE).len(), 4);

        model.queue("critique");
        let critique = service.submit_answer(CANDIDATE, "My answer").await.unwrap();
        assert!(!critique.is_empty());
        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[4].role, Role::User);

        model.queue("final feedback");
        let feedback = service.end_interview(CANDIDATE).await.unwrap();
        assert!(!feedback.is_empty());

        let session = db.find_latest_session(CANDIDATE).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(db.list_turns(&session.id).unwrap().len(), 5);

        // The feedback call saw the full five-turn context.
        assert_eq!(
            model.calls().last().unwrap(),
            &(5, FEEDBACK_DIRECTIVE.to_string())
        );
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenroom.db");

        {
            let db = Database::open(&path).unwrap();
            let service = InterviewService::new(db, Arc::new(MockModel::new()));
            service.start(CANDIDATE).await.unwrap();
            service
                .submit_profile(CANDIDATE, "JD1", "Resume1")
                .await
                .unwrap();
        }

        // A fresh process sees the same session and continues it.
        let db = Database::open(&path).unwrap();
        let model = Arc::new(MockModel::new());
        let service = InterviewService::new(db.clone(), model.clone());

        assert!(!service.start(CANDIDATE).await.unwrap().created_new_session);

        model.queue("Q1");
        assert_eq!(service.request_question(CANDIDATE).await.unwrap(), "Q1");

        let turns = turns_for(&db, CANDIDATE);
        assert_eq!(turns.len(), 4);
        let seqs: Vec<i64> = turns.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }
}
