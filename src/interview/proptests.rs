//! Property tests for the interview state machine
//!
//! Whatever order clients fire operations in, the persisted turn
//! sequence must stay well-formed: contiguous sequence numbers, a
//! system turn first, never two questions pending at once.

use super::phase::SessionPhase;
use super::service::InterviewService;
use super::testing::MockModel;
use crate::db::{Database, Role, Session, SessionStatus, Turn};
use chrono::Utc;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Profile,
    Question,
    Answer,
    End,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Profile),
        Just(Op::Question),
        Just(Op::Answer),
        Just(Op::End),
    ]
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)]
}

fn turns_with_roles(roles: &[Role]) -> Vec<Turn> {
    roles
        .iter()
        .enumerate()
        .map(|(i, role)| Turn {
            session_id: "s1".to_string(),
            seq: i as i64,
            role: *role,
            content: format!("turn {i}"),
            created_at: Utc::now(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Phase derivation follows the turn-shape signature exactly.
    #[test]
    fn phase_matches_turn_signature(roles in prop::collection::vec(role_strategy(), 0..10)) {
        let session = Session {
            id: "s1".to_string(),
            candidate_id: "p@example.com".to_string(),
            status: SessionStatus::Ongoing,
            feedback: None,
            created_at: Utc::now(),
        };
        let turns = turns_with_roles(&roles);

        let expected = if turns.len() < 3 {
            SessionPhase::AwaitingProfile
        } else if roles.last() == Some(&Role::Assistant) {
            SessionPhase::QuestionPending
        } else {
            SessionPhase::Ready
        };
        prop_assert_eq!(SessionPhase::derive(Some(&session), &turns), expected);

        // A completed or missing session always derives NoSession.
        let completed = Session {
            status: SessionStatus::Completed,
            ..session
        };
        prop_assert_eq!(
            SessionPhase::derive(Some(&completed), &turns),
            SessionPhase::NoSession
        );
        prop_assert_eq!(SessionPhase::derive(None, &turns), SessionPhase::NoSession);
    }

    /// Random operation sequences never corrupt the persisted turns.
    #[test]
    fn operations_never_corrupt_turn_sequence(
        ops in prop::collection::vec(op_strategy(), 1..24)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        rt.block_on(async {
            let db = Database::open_in_memory().unwrap();
            let model = Arc::new(MockModel::new());
            let service = InterviewService::new(db.clone(), model.clone());
            let candidate = "p@example.com";

            for op in &ops {
                model.queue("reply");
                // Out-of-order operations are expected to be rejected;
                // the property is that rejection never mutates state.
                let _ = match op {
                    Op::Start => service.start(candidate).await.map(|_| String::new()),
                    Op::Profile => service
                        .submit_profile(candidate, "JD", "Resume")
                        .await
                        .map(|()| String::new()),
                    Op::Question => service.request_question(candidate).await,
                    Op::Answer => service.submit_answer(candidate, "answer").await,
                    Op::End => service.end_interview(candidate).await,
                };

                if let Some(session) = db.find_latest_session(candidate).unwrap() {
                    let turns = db.list_turns(&session.id).unwrap();

                    for (i, turn) in turns.iter().enumerate() {
                        prop_assert_eq!(turn.seq, i as i64, "gap in sequence numbers");
                    }
                    if let Some(first) = turns.first() {
                        prop_assert_eq!(first.role, Role::System);
                    }
                    for pair in turns.windows(2) {
                        prop_assert!(
                            !(pair[0].role == Role::Assistant
                                && pair[1].role == Role::Assistant),
                            "two questions pending at once"
                        );
                    }
                    if session.status == SessionStatus::Completed {
                        prop_assert!(session.feedback.is_some());
                    }
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
