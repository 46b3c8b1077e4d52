//! HTTP client for the classroom backend.
//!
//! The backend issues room tokens, answers questions, generates and scores
//! quizzes, and tears rooms down. Every call is fallible; callers decide how
//! to degrade.

pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::BackendConfig;
use crate::protocol::Id;
use crate::quiz::{QuizResult, QuizResultsReport};

pub use types::*;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse backend response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, BackendError>;

    async fn room_status(&self, room: &str) -> Result<RoomStatus, BackendError>;

    async fn ask_ai(&self, question: &str) -> Result<AskAiResponse, BackendError>;

    async fn generate_quiz(
        &self,
        request: &GenerateQuizRequest,
    ) -> Result<GenerateQuizResponse, BackendError>;

    async fn generate_summary(&self, request: &SummaryRequest)
        -> Result<SummaryResponse, BackendError>;

    async fn submit_quiz(&self, request: &SubmitQuizRequest) -> Result<QuizResult, BackendError>;

    async fn quiz_results(&self, quiz_id: &Id) -> Result<QuizResultsReport, BackendError>;

    async fn end_room(&self, room: &str) -> Result<(), BackendError>;

    async fn encourage_student(
        &self,
        request: &EncourageRequest,
    ) -> Result<EncourageResponse, BackendError>;

    async fn extract_question(
        &self,
        transcript: &str,
    ) -> Result<ExtractQuestionResponse, BackendError>;
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_json(response).await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Percent-encodes one URL path segment.
fn path_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[async_trait]
impl Backend for BackendClient {
    async fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, BackendError> {
        self.post_json("/token", request).await
    }

    async fn room_status(&self, room: &str) -> Result<RoomStatus, BackendError> {
        self.get_json(&format!("/room-status/{}", path_segment(room)))
            .await
    }

    async fn ask_ai(&self, question: &str) -> Result<AskAiResponse, BackendError> {
        let request = AskAiRequest {
            question: question.to_string(),
        };
        self.post_json("/ask-ai", &request).await
    }

    async fn generate_quiz(
        &self,
        request: &GenerateQuizRequest,
    ) -> Result<GenerateQuizResponse, BackendError> {
        self.post_json("/generate-quiz", request).await
    }

    async fn generate_summary(
        &self,
        request: &SummaryRequest,
    ) -> Result<SummaryResponse, BackendError> {
        self.post_json("/generate-summary", request).await
    }

    async fn submit_quiz(&self, request: &SubmitQuizRequest) -> Result<QuizResult, BackendError> {
        self.post_json("/submit-quiz", request).await
    }

    async fn quiz_results(&self, quiz_id: &Id) -> Result<QuizResultsReport, BackendError> {
        self.get_json(&format!("/quiz-results/{}", path_segment(&quiz_id.to_string())))
            .await
    }

    async fn end_room(&self, room: &str) -> Result<(), BackendError> {
        let request = EndRoomRequest {
            room_name: room.to_string(),
        };
        let _: serde_json::Value = self.post_json("/end-room", &request).await?;
        Ok(())
    }

    async fn encourage_student(
        &self,
        request: &EncourageRequest,
    ) -> Result<EncourageResponse, BackendError> {
        self.post_json("/encourage-student", request).await
    }

    async fn extract_question(
        &self,
        transcript: &str,
    ) -> Result<ExtractQuestionResponse, BackendError> {
        let request = ExtractQuestionRequest {
            transcript: transcript.to_string(),
        };
        self.post_json("/extract-question", &request).await
    }
}
