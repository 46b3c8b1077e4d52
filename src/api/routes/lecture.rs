//! Class video and meeting lifecycle endpoints.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::ClassroomState;
use crate::api::error::{ApiError, ApiResult};
use crate::lecture::LectureState;

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    /// Video length in seconds.
    pub duration: f64,
}

pub fn router(state: ClassroomState) -> Router {
    Router::new()
        .route("/lecture", get(lecture_state))
        .route("/lecture/load", post(load))
        .route("/lecture/start", post(start))
        .route("/lecture/play", post(play))
        .route("/lecture/pause", post(pause))
        .route("/lecture/ended", post(ended))
        .route("/meeting/end", post(end_meeting))
        .with_state(state)
}

async fn lecture_state(State(state): State<ClassroomState>) -> Json<LectureState> {
    Json(state.classroom.lecture_state().await)
}

async fn load(
    State(state): State<ClassroomState>,
    Json(request): Json<LoadRequest>,
) -> ApiResult<Json<LectureState>> {
    if !request.duration.is_finite() || request.duration < 0.0 {
        return Err(ApiError::bad_request("duration must be a non-negative number"));
    }
    Ok(Json(state.classroom.lecture_load(request.duration).await?))
}

async fn start(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    let started = state.classroom.lecture_start().await?;
    Ok(Json(json!({ "started": started })))
}

async fn play(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    let playing = state.classroom.lecture_play().await?;
    Ok(Json(json!({ "changed": playing })))
}

async fn pause(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    let paused = state.classroom.lecture_pause().await?;
    Ok(Json(json!({ "changed": paused })))
}

async fn ended(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    state.classroom.lecture_ended().await?;
    Ok(Json(json!({ "success": true })))
}

async fn end_meeting(State(state): State<ClassroomState>) -> ApiResult<Json<Value>> {
    info!("End meeting requested via API");
    state.classroom.end_meeting().await?;
    Ok(Json(json!({ "success": true, "message": "Meeting ended" })))
}
