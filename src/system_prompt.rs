//! Fixed interviewer instructions and per-call directives

/// Instructions installed as the session's opening system turn.
///
/// Encodes the interviewer's behavior, the hiring bar (80% of questions
/// answered correctly), and the feedback length constraint.
pub const INTERVIEWER_PROMPT: &str = "You are an Interviewer. You need to ask questions to \
the interviewee based on the resume and JD. You have to ask questions only when the user says \
\"generate a question\". You'll have to give your honest feedback to the user after the \
interview, when the user says \"give me the feedback of the interview\", and whether he can \
be hired in our organization or not. As a reference, if 80% of questions are answered \
correctly, you can hire the interviewee. You'll have to give your feedback in 200 words.";

/// Directive for generating the next interview question.
pub const QUESTION_DIRECTIVE: &str = "generate a question";

/// Directive for critiquing the answer that was just submitted.
pub const CRITIQUE_DIRECTIVE: &str =
    "briefly critique my last answer, then wait for the next question request";

/// Directive for producing the final hire/no-hire feedback.
pub const FEEDBACK_DIRECTIVE: &str = "give me the feedback of the interview";

/// Content of the persisted resume turn.
pub fn resume_turn(resume: &str) -> String {
    format!("resume: {resume}")
}

/// Content of the persisted job-description turn.
pub fn jd_turn(job_description: &str) -> String {
    format!("JD: {job_description}")
}
