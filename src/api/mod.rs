//! Local control API for the classroom session.
//!
//! Provides HTTP endpoints for:
//! - Room events forwarded by the video bridge (data messages, participants)
//! - Teacher doubt handling, quizzes, lecture video and meeting end
//! - Student hand raises, doubts, voice transcripts and quiz answers
//! - Spreadsheet reports

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::session::Classroom;
use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::ClassroomState;

pub struct ApiServer {
    port: u16,
    state: ClassroomState,
}

impl ApiServer {
    pub fn new(classroom: Classroom, config: &Config) -> Self {
        Self {
            port: config.api.port,
            state: ClassroomState { classroom },
        }
    }

    /// Builds the full router without binding a socket.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .with_state(self.state.clone())
            .merge(routes::session::router(self.state.clone()))
            .merge(routes::doubts::router(self.state.clone()))
            .merge(routes::quiz::router(self.state.clone()))
            .merge(routes::lecture::router(self.state.clone()))
            .merge(routes::reports::router(self.state.clone()))
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let address = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind API server to {}", address))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.router();
        let address = listener.local_addr()?;

        info!("API server listening on http://{}", address);
        info!("Endpoints:");
        info!("  GET  /                        - Service info");
        info!("  GET  /state                   - Session snapshot");
        info!("  POST /messages                - Inbound data message");
        info!("  POST /participants/connected  - Participant joined");
        info!("  POST /participants/disconnected - Participant left");
        info!("  POST /doubts/:id/ask-ai       - Ask the AI about a doubt");
        info!("  POST /doubts/:id/send         - Broadcast a doubt's answer");
        info!("  POST /doubts/:id/resolve      - Resolve a doubt");
        info!("  PUT  /doubts/:id/text         - Edit a doubt");
        info!("  POST /audio/stop              - Stop answer audio everywhere");
        info!("  POST /hand/toggle             - Raise or lower your hand");
        info!("  POST /doubts                  - Ask a doubt");
        info!("  POST /voice/start             - Voice doubt recording started");
        info!("  POST /transcripts             - Submit a voice doubt transcript");
        info!("  POST /quiz/generate           - Generate and start a quiz");
        info!("  GET  /quiz/results            - Latest quiz results");
        info!("  GET  /quiz                    - Current quiz state");
        info!("  POST /quiz/select             - Select an answer");
        info!("  POST /quiz/next               - Next question");
        info!("  POST /quiz/close              - Close the quiz");
        info!("  POST /lecture/load            - Load the class video");
        info!("  POST /lecture/start           - Start the class");
        info!("  POST /lecture/play            - Resume the class video");
        info!("  POST /lecture/pause           - Pause the class video");
        info!("  POST /lecture/ended           - Class video ended");
        info!("  POST /meeting/end             - End the meeting");
        info!("  POST /reports/class           - Write the class report");
        info!("  POST /reports/quiz            - Write the quiz report");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status(State(state): State<ClassroomState>) -> Json<Value> {
    let session = state.classroom.session().lock().await;
    Json(json!({
        "service": "classroom",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "identity": session.identity(),
        "room": session.room(),
        "role": session.role(),
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "classroom"
    }))
}
