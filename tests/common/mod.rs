//! In-memory room, backend and speaker shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use classroom::backend::*;
use classroom::config::TimingConfig;
use classroom::lecture::Playback;
use classroom::metadata::SessionMetadata;
use classroom::protocol::{ClassMessage, Id};
use classroom::quiz::{QuizQuestion, QuizResult, QuizResultsReport};
use classroom::session::{ClassSession, Classroom, SessionDeps};
use classroom::speech::{Announcer, SpeechError, Speaker};
use classroom::transport::RoomTransport;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// Speaker that takes a fixed time per utterance and records what it said.
pub struct TestSpeaker {
    duration: Duration,
    spoken: Mutex<Vec<String>>,
}

impl TestSpeaker {
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        lock(&self.spoken).clone()
    }
}

#[async_trait]
impl Speaker for TestSpeaker {
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), SpeechError> {
        lock(&self.spoken).push(text.to_string());
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(()),
            _ = cancel.cancelled() => Err(SpeechError::Interrupted),
        }
    }
}

/// Captures outbound broadcasts so a test can relay them to other sessions.
#[derive(Default)]
pub struct Outbox {
    messages: Mutex<Vec<ClassMessage>>,
    disconnected: Mutex<bool>,
}

impl Outbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns everything published since the last drain.
    pub fn drain(&self) -> Vec<ClassMessage> {
        std::mem::take(&mut *lock(&self.messages))
    }

    pub fn disconnected(&self) -> bool {
        *lock(&self.disconnected)
    }
}

#[async_trait]
impl RoomTransport for Outbox {
    async fn publish(&self, message: &ClassMessage) -> Result<()> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        *lock(&self.disconnected) = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct TestPlayback {
    plays: Mutex<usize>,
    pauses: Mutex<usize>,
}

impl TestPlayback {
    pub fn plays(&self) -> usize {
        *lock(&self.plays)
    }

    pub fn pauses(&self) -> usize {
        *lock(&self.pauses)
    }
}

#[async_trait]
impl Playback for TestPlayback {
    async fn play(&self) -> Result<()> {
        *lock(&self.plays) += 1;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        *lock(&self.pauses) += 1;
        Ok(())
    }
}

/// Backend answering every question the same way and serving one quiz.
#[derive(Default)]
pub struct TestBackend {
    pub answer: Mutex<Option<String>>,
    pub quiz: Mutex<Vec<QuizQuestion>>,
    pub extracted: Mutex<Option<String>>,
    pub submissions: Mutex<Vec<SubmitQuizRequest>>,
    pub ended_rooms: Mutex<Vec<String>>,
}

impl TestBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn submissions(&self) -> Vec<SubmitQuizRequest> {
        lock(&self.submissions).clone()
    }

    pub fn ended_rooms(&self) -> Vec<String> {
        lock(&self.ended_rooms).clone()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn request_token(&self, request: &TokenRequest) -> Result<TokenResponse, BackendError> {
        Ok(TokenResponse {
            token: Some(serde_json::Value::String(format!("token-{}", request.name))),
            url: None,
        })
    }

    async fn room_status(&self, _room: &str) -> Result<RoomStatus, BackendError> {
        Ok(RoomStatus::default())
    }

    async fn ask_ai(&self, _question: &str) -> Result<AskAiResponse, BackendError> {
        Ok(AskAiResponse {
            answer: lock(&self.answer).clone(),
        })
    }

    async fn generate_quiz(
        &self,
        _request: &GenerateQuizRequest,
    ) -> Result<GenerateQuizResponse, BackendError> {
        Ok(GenerateQuizResponse {
            quiz_id: Some(Id::from("quiz-42")),
            questions: lock(&self.quiz).clone(),
        })
    }

    async fn generate_summary(
        &self,
        _request: &SummaryRequest,
    ) -> Result<SummaryResponse, BackendError> {
        Ok(SummaryResponse {
            summary: Some("We covered cells.".to_string()),
        })
    }

    async fn submit_quiz(&self, request: &SubmitQuizRequest) -> Result<QuizResult, BackendError> {
        lock(&self.submissions).push(request.clone());
        let correct = request.answers.iter().filter(|a| a.is_some()).count() as u32;
        Ok(QuizResult {
            results: Vec::new(),
            score: 0.0,
            correct_count: correct,
            total_questions: request.answers.len() as u32,
        })
    }

    async fn quiz_results(&self, _quiz_id: &Id) -> Result<QuizResultsReport, BackendError> {
        Ok(QuizResultsReport::default())
    }

    async fn end_room(&self, room: &str) -> Result<(), BackendError> {
        lock(&self.ended_rooms).push(room.to_string());
        Ok(())
    }

    async fn encourage_student(
        &self,
        _request: &EncourageRequest,
    ) -> Result<EncourageResponse, BackendError> {
        Ok(EncourageResponse {
            encouragement: Some("Great question!".to_string()),
        })
    }

    async fn extract_question(
        &self,
        _transcript: &str,
    ) -> Result<ExtractQuestionResponse, BackendError> {
        Ok(ExtractQuestionResponse {
            extracted_question: lock(&self.extracted).clone(),
        })
    }
}

/// One participant's classroom with its fakes.
pub struct Participant {
    pub classroom: Classroom,
    pub outbox: Arc<Outbox>,
    pub playback: Arc<TestPlayback>,
    pub speaker: Arc<TestSpeaker>,
}

impl Participant {
    pub fn join(
        identity: &str,
        metadata: &str,
        backend: Arc<TestBackend>,
        reports_dir: &Path,
    ) -> Self {
        let outbox = Outbox::new();
        let playback = Arc::new(TestPlayback::default());
        let speaker = TestSpeaker::new(Duration::from_millis(500));
        let deps = SessionDeps {
            announcer: Announcer::new(speaker.clone()),
            backend,
            timing: TimingConfig::default(),
        };
        let session = ClassSession::new(
            identity,
            "bio-101",
            &SessionMetadata::read(metadata),
            deps.clone(),
        )
        .unwrap();
        let classroom = Classroom::new(
            session,
            deps,
            outbox.clone(),
            playback.clone(),
            reports_dir.to_path_buf(),
        )
        .unwrap();

        Self {
            classroom,
            outbox,
            playback,
            speaker,
        }
    }

    /// Delivers everything this participant published to the others, the way
    /// the room's data channel would.
    pub async fn relay_to(&self, others: &[&Participant]) -> Vec<ClassMessage> {
        let messages = self.outbox.drain();
        for message in &messages {
            for other in others {
                let payload = message.encode().unwrap();
                other.classroom.handle_payload(&payload).await;
            }
        }
        messages
    }
}
