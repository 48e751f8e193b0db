//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to start or resume an interview
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub candidate_id: String,
}

/// Request to attach the resume and job description
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub candidate_id: String,
    pub job_description: String,
    pub resume: String,
}

/// Request for the next interview question
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub candidate_id: String,
}

/// Request submitting an answer to the pending question
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub candidate_id: String,
    pub answer: String,
}

/// Request to end the interview
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRequest {
    pub candidate_id: String,
}

/// Response for start
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub created_new_session: bool,
}

/// Response for profile submission
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub ok: bool,
}

/// Response carrying a generated question
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
}

/// Response carrying the ephemeral critique of an answer
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub critique: String,
}

/// Response carrying the final interview feedback
#[derive(Debug, Serialize)]
pub struct EndResponse {
    pub feedback: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
