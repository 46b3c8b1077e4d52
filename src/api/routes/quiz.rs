//! Quiz endpoints for both roles.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ClassroomState;
use crate::api::error::ApiResult;
use crate::quiz::{Quiz, QuizResultsReport, QuizRunner};

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub option: usize,
}

pub fn router(state: ClassroomState) -> Router {
    Router::new()
        .route("/quiz", get(quiz_state))
        .route("/quiz/generate", post(generate_quiz))
        .route("/quiz/results", get(quiz_results))
        .route("/quiz/select", post(select_option))
        .route("/quiz/next", post(next_question))
        .route("/quiz/close", post(close_quiz))
        .with_state(state)
}

/// Teacher: the generated quiz, correct answers included.
async fn generate_quiz(State(state): State<ClassroomState>) -> ApiResult<Json<Quiz>> {
    Ok(Json(state.classroom.generate_quiz().await?))
}

/// Teacher: latest polled results, `null` until the first poll succeeds.
async fn quiz_results(
    State(state): State<ClassroomState>,
) -> ApiResult<Json<Option<QuizResultsReport>>> {
    Ok(Json(state.classroom.quiz_results().await?))
}

async fn quiz_state(State(state): State<ClassroomState>) -> ApiResult<Json<QuizRunner>> {
    Ok(Json(state.classroom.quiz_state().await?))
}

async fn select_option(
    State(state): State<ClassroomState>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<Value>> {
    state.classroom.quiz_select(request.option).await?;
    Ok(Json(json!({ "accepted": true })))
}

async fn next_question(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    state.classroom.quiz_next().await?;
    Ok(Json(json!({ "accepted": true })))
}

async fn close_quiz(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    state.classroom.quiz_close().await?;
    Ok(Json(json!({ "success": true })))
}
