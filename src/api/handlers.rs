//! HTTP request handlers

use super::types::{
    AnswerRequest, AnswerResponse, EndRequest, EndResponse, ErrorResponse, ProfileRequest,
    ProfileResponse, QuestionRequest, QuestionResponse, StartRequest, StartResponse,
};
use super::AppState;
use crate::interview::{InterviewError, TransitionBlock};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/interview/start", post(start_interview))
        .route("/api/interview/profile", post(submit_profile))
        .route("/api/interview/question", post(request_question))
        .route("/api/interview/answer", post(submit_answer))
        .route("/api/interview/end", post(end_interview))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Interview Operations
// ============================================================

async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let outcome = state.interviews.start(&req.candidate_id).await?;
    Ok(Json(StartResponse {
        created_new_session: outcome.created_new_session,
    }))
}

async fn submit_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    state
        .interviews
        .submit_profile(&req.candidate_id, &req.job_description, &req.resume)
        .await?;
    Ok(Json(ProfileResponse { ok: true }))
}

async fn request_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let question = state.interviews.request_question(&req.candidate_id).await?;
    Ok(Json(QuestionResponse { question }))
}

async fn submit_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let critique = state
        .interviews
        .submit_answer(&req.candidate_id, &req.answer)
        .await?;
    Ok(Json(AnswerResponse { critique }))
}

async fn end_interview(
    State(state): State<AppState>,
    Json(req): Json<EndRequest>,
) -> Result<Json<EndResponse>, AppError> {
    let feedback = state.interviews.end_interview(&req.candidate_id).await?;
    Ok(Json(EndResponse { feedback }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("greenroom ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

/// Wrapper mapping core errors onto HTTP statuses
struct AppError(InterviewError);

impl From<InterviewError> for AppError {
    fn from(err: InterviewError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterviewError::Validation(_) => StatusCode::BAD_REQUEST,
            InterviewError::InvalidTransition {
                block: TransitionBlock::NoActiveSession,
                ..
            } => StatusCode::NOT_FOUND,
            InterviewError::InvalidTransition { .. } => StatusCode::CONFLICT,
            InterviewError::ModelUnavailable(_) => StatusCode::BAD_GATEWAY,
            InterviewError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = Json(ErrorResponse::new(self.0.to_string()));
        (status, body).into_response()
    }
}
