//! Spreadsheet report endpoints.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ClassroomState;
use crate::api::error::ApiResult;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    /// File or directory to write to. Defaults to the reports directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub path: PathBuf,
}

pub fn router(state: ClassroomState) -> Router {
    Router::new()
        .route("/reports/class", post(class_report))
        .route("/reports/quiz", post(quiz_report))
        .with_state(state)
}

async fn class_report(
    State(state): State<ClassroomState>,
    body: Option<Json<ReportRequest>>,
) -> ApiResult<Json<ReportResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let path = state
        .classroom
        .export_class_report(request.output.as_deref())
        .await?;
    Ok(Json(ReportResponse { path }))
}

async fn quiz_report(
    State(state): State<ClassroomState>,
    body: Option<Json<ReportRequest>>,
) -> ApiResult<Json<ReportResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let path = state
        .classroom
        .export_quiz_report(request.output.as_deref())
        .await?;
    Ok(Json(ReportResponse { path }))
}
