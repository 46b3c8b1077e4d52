//! Request and response bodies for the classroom backend.

use serde::{Deserialize, Serialize};

use crate::protocol::Id;
use crate::quiz::QuizQuestion;

#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    pub name: String,
    pub room: String,
    pub role: String,
}

/// `token` stays untyped: anything but a string means no usable token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TokenResponse {
    pub fn token_str(&self) -> Option<&str> {
        self.token.as_ref().and_then(|t| t.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomStatus {
    #[serde(default)]
    pub ended: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskAiRequest {
    pub question: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskAiResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    pub topic: String,
    pub student_questions: Vec<String>,
    pub room_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizResponse {
    #[serde(default)]
    pub quiz_id: Option<Id>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub topic: String,
    pub student_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub quiz_id: Id,
    pub student_name: String,
    pub answers: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRoomRequest {
    pub room_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncourageRequest {
    pub name: String,
    pub question: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncourageResponse {
    #[serde(default)]
    pub encouragement: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractQuestionRequest {
    pub transcript: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractQuestionResponse {
    #[serde(default)]
    pub extracted_question: Option<String>,
}
