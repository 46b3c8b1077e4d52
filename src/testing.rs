//! In-memory collaborators for unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backend::*;
use crate::lecture::Playback;
use crate::protocol::{ClassMessage, Id};
use crate::quiz::{QuizResult, QuizResultsReport};
use crate::speech::{SpeechError, Speaker};
use crate::transport::RoomTransport;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

pub struct RecordingSpeaker {
    duration: Duration,
    failure: Option<SpeechError>,
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            failure: None,
            started: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: SpeechError) -> Arc<Self> {
        Arc::new(Self {
            duration: Duration::ZERO,
            failure: Some(error),
            started: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }

    pub fn started(&self) -> Vec<String> {
        lock(&self.started).clone()
    }

    pub fn completed(&self) -> Vec<String> {
        lock(&self.completed).clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), SpeechError> {
        lock(&self.started).push(text.to_string());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {
                lock(&self.completed).push(text.to_string());
                Ok(())
            }
            _ = cancel.cancelled() => Err(SpeechError::Interrupted),
        }
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<ClassMessage>>,
    disconnects: Mutex<usize>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<ClassMessage> {
        lock(&self.published).clone()
    }

    pub fn disconnects(&self) -> usize {
        *lock(&self.disconnects)
    }
}

#[async_trait]
impl RoomTransport for RecordingTransport {
    async fn publish(&self, message: &ClassMessage) -> Result<()> {
        lock(&self.published).push(message.clone());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        *lock(&self.disconnects) += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePlayback {
    plays: Mutex<usize>,
    pauses: Mutex<usize>,
}

impl FakePlayback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn plays(&self) -> usize {
        *lock(&self.plays)
    }

    pub fn pauses(&self) -> usize {
        *lock(&self.pauses)
    }
}

#[async_trait]
impl Playback for FakePlayback {
    async fn play(&self) -> Result<()> {
        *lock(&self.plays) += 1;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        *lock(&self.pauses) += 1;
        Ok(())
    }
}

struct Canned {
    token: Result<TokenResponse, BackendError>,
    room_status: Result<RoomStatus, BackendError>,
    answer: Result<AskAiResponse, BackendError>,
    quiz: Result<GenerateQuizResponse, BackendError>,
    summary: Result<SummaryResponse, BackendError>,
    submissions_fail: bool,
    quiz_results: Result<QuizResultsReport, String>,
    end_room_fails: bool,
    encouragement: Option<String>,
    extracted: Option<String>,
}

#[derive(Default)]
struct Calls {
    token_requests: Vec<TokenRequest>,
    questions: Vec<String>,
    quiz_requests: Vec<GenerateQuizRequest>,
    summary_requests: Vec<SummaryRequest>,
    submissions: Vec<SubmitQuizRequest>,
    quiz_result_calls: usize,
    ended_rooms: Vec<String>,
    extract_calls: usize,
}

pub struct FakeBackend {
    canned: Mutex<Canned>,
    calls: Mutex<Calls>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            canned: Mutex::new(Canned {
                token: Ok(TokenResponse::default()),
                room_status: Ok(RoomStatus::default()),
                answer: Ok(AskAiResponse::default()),
                quiz: Ok(GenerateQuizResponse::default()),
                summary: Ok(SummaryResponse::default()),
                submissions_fail: false,
                quiz_results: Ok(QuizResultsReport::default()),
                end_room_fails: false,
                encouragement: None,
                extracted: None,
            }),
            calls: Mutex::new(Calls::default()),
        })
    }

    pub fn set_token(&self, token: Result<TokenResponse, BackendError>) {
        lock(&self.canned).token = token;
    }

    pub fn set_room_status(&self, status: Result<RoomStatus, BackendError>) {
        lock(&self.canned).room_status = status;
    }

    pub fn set_answer(&self, answer: Result<AskAiResponse, BackendError>) {
        lock(&self.canned).answer = answer;
    }

    pub fn set_quiz(&self, quiz: Result<GenerateQuizResponse, BackendError>) {
        lock(&self.canned).quiz = quiz;
    }

    pub fn set_summary(&self, summary: Result<SummaryResponse, BackendError>) {
        lock(&self.canned).summary = summary;
    }

    pub fn fail_submissions(&self) {
        lock(&self.canned).submissions_fail = true;
    }

    pub fn set_quiz_results(&self, results: Result<QuizResultsReport, String>) {
        lock(&self.canned).quiz_results = results;
    }

    pub fn fail_end_room(&self) {
        lock(&self.canned).end_room_fails = true;
    }

    pub fn set_encouragement(&self, text: Option<&str>) {
        lock(&self.canned).encouragement = text.map(String::from);
    }

    pub fn set_extracted_question(&self, text: Option<&str>) {
        lock(&self.canned).extracted = text.map(String::from);
    }

    pub fn token_requests(&self) -> Vec<TokenRequest> {
        lock(&self.calls).token_requests.clone()
    }

    pub fn questions(&self) -> Vec<String> {
        lock(&self.calls).questions.clone()
    }

    pub fn quiz_requests(&self) -> Vec<GenerateQuizRequest> {
        lock(&self.calls).quiz_requests.clone()
    }

    pub fn summary_requests(&self) -> Vec<SummaryRequest> {
        lock(&self.calls).summary_requests.clone()
    }

    pub fn submissions(&self) -> Vec<SubmitQuizRequest> {
        lock(&self.calls).submissions.clone()
    }

    pub fn quiz_result_calls(&self) -> usize {
        lock(&self.calls).quiz_result_calls
    }

    pub fn ended_rooms(&self) -> Vec<String> {
        lock(&self.calls).ended_rooms.clone()
    }

    pub fn extract_calls(&self) -> usize {
        lock(&self.calls).extract_calls
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, BackendError> {
        lock(&self.calls).token_requests.push(request.clone());
        lock(&self.canned).token.clone()
    }

    async fn room_status(&self, _room: &str) -> Result<RoomStatus, BackendError> {
        lock(&self.canned).room_status.clone()
    }

    async fn ask_ai(&self, question: &str) -> Result<AskAiResponse, BackendError> {
        lock(&self.calls).questions.push(question.to_string());
        lock(&self.canned).answer.clone()
    }

    async fn generate_quiz(
        &self,
        request: &GenerateQuizRequest,
    ) -> Result<GenerateQuizResponse, BackendError> {
        lock(&self.calls).quiz_requests.push(request.clone());
        lock(&self.canned).quiz.clone()
    }

    async fn generate_summary(
        &self,
        request: &SummaryRequest,
    ) -> Result<SummaryResponse, BackendError> {
        lock(&self.calls).summary_requests.push(request.clone());
        lock(&self.canned).summary.clone()
    }

    async fn submit_quiz(&self, request: &SubmitQuizRequest) -> Result<QuizResult, BackendError> {
        lock(&self.calls).submissions.push(request.clone());
        if lock(&self.canned).submissions_fail {
            return Err(BackendError::Request("connection refused".to_string()));
        }
        Ok(QuizResult {
            results: Vec::new(),
            score: 0.0,
            correct_count: 0,
            total_questions: request.answers.len() as u32,
        })
    }

    async fn quiz_results(&self, _quiz_id: &Id) -> Result<QuizResultsReport, BackendError> {
        lock(&self.calls).quiz_result_calls += 1;
        lock(&self.canned)
            .quiz_results
            .clone()
            .map_err(BackendError::Request)
    }

    async fn end_room(&self, room: &str) -> Result<(), BackendError> {
        lock(&self.calls).ended_rooms.push(room.to_string());
        if lock(&self.canned).end_room_fails {
            return Err(BackendError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }

    async fn encourage_student(
        &self,
        _request: &EncourageRequest,
    ) -> Result<EncourageResponse, BackendError> {
        Ok(EncourageResponse {
            encouragement: lock(&self.canned).encouragement.clone(),
        })
    }

    async fn extract_question(
        &self,
        _transcript: &str,
    ) -> Result<ExtractQuestionResponse, BackendError> {
        lock(&self.calls).extract_calls += 1;
        Ok(ExtractQuestionResponse {
            extracted_question: lock(&self.canned).extracted.clone(),
        })
    }
}
