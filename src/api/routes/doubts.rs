//! Doubt, hand-raise and audio endpoints.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ClassroomState;
use crate::api::error::ApiResult;
use crate::doubts::Doubt;
use crate::protocol::{Id, StudentDoubt};

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub transcript: String,
}

pub fn router(state: ClassroomState) -> Router {
    Router::new()
        .route("/doubts", post(ask_doubt))
        .route("/doubts/:id/ask-ai", post(ask_ai))
        .route("/doubts/:id/send", post(send_to_student))
        .route("/doubts/:id/resolve", post(resolve_doubt))
        .route("/doubts/:id/text", put(update_text))
        .route("/audio/stop", post(stop_audio))
        .route("/hand/toggle", post(toggle_hand))
        .route("/voice/start", post(voice_started))
        .route("/transcripts", post(submit_transcript))
        .with_state(state)
}

async fn ask_ai(
    State(state): State<ClassroomState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = Id::from_path(&id);
    let answer = state.classroom.ask_ai(&id).await?;
    Ok(Json(json!({ "id": id, "answer": answer })))
}

async fn send_to_student(
    State(state): State<ClassroomState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = Id::from_path(&id);
    state.classroom.send_to_student(&id).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn resolve_doubt(
    State(state): State<ClassroomState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Doubt>> {
    let doubt = state.classroom.resolve_doubt(&Id::from_path(&id)).await?;
    Ok(Json(doubt))
}

async fn update_text(
    State(state): State<ClassroomState>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> ApiResult<Json<Value>> {
    let id = Id::from_path(&id);
    state.classroom.update_doubt_text(&id, &request.text).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn stop_audio(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    state.classroom.stop_ai_audio().await?;
    Ok(Json(json!({ "success": true })))
}

async fn toggle_hand(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    let raised = state.classroom.toggle_hand().await?;
    Ok(Json(json!({ "raised": raised })))
}

async fn ask_doubt(
    State(state): State<ClassroomState>,
    Json(request): Json<TextRequest>,
) -> ApiResult<Json<StudentDoubt>> {
    let doubt = state.classroom.ask_doubt(&request.text).await?;
    Ok(Json(doubt))
}

async fn voice_started(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    state.classroom.voice_started().await?;
    Ok(Json(json!({ "success": true })))
}

/// Responds with the extracted doubt, or `null` when nothing was asked.
async fn submit_transcript(
    State(state): State<ClassroomState>,
    Json(request): Json<TranscriptRequest>,
) -> ApiResult<Json<Option<StudentDoubt>>> {
    let doubt = state
        .classroom
        .submit_transcript(&request.transcript)
        .await?;
    Ok(Json(doubt))
}
