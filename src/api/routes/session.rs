//! Session state and room event endpoints.
//!
//! The room bridge forwards every data-channel payload to `POST /messages`
//! and participant changes to `/participants/*`.

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ClassroomState;
use crate::session::SessionSnapshot;

#[derive(Debug, Deserialize)]
pub struct ParticipantEvent {
    pub identity: String,
    #[serde(default)]
    pub metadata: String,
}

pub fn router(state: ClassroomState) -> Router {
    Router::new()
        .route("/state", get(session_state))
        .route("/messages", post(receive_message))
        .route("/participants/connected", post(participant_connected))
        .route("/participants/disconnected", post(participant_disconnected))
        .with_state(state)
}

async fn session_state(State(state): State<ClassroomState>) -> Json<SessionSnapshot> {
    Json(state.classroom.snapshot().await)
}

/// Accepts any body; payloads that do not decode are dropped.
async fn receive_message(State(state): State<ClassroomState>, body: Bytes) -> Json<Value> {
    debug!("Received {} byte data message", body.len());
    state.classroom.handle_payload(&body).await;
    Json(json!({ "accepted": true }))
}

async fn participant_connected(
    State(state): State<ClassroomState>,
    Json(event): Json<ParticipantEvent>,
) -> Json<Value> {
    state
        .classroom
        .participant_connected(&event.identity, &event.metadata)
        .await;
    Json(json!({ "success": true }))
}

async fn participant_disconnected(
    State(state): State<ClassroomState>,
    Json(event): Json<ParticipantEvent>,
) -> Json<Value> {
    state
        .classroom
        .participant_disconnected(&event.identity)
        .await;
    Json(json!({ "success": true }))
}
