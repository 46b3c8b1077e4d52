//! Voice doubts: turning a finished spoken transcript into a STUDENT_DOUBT.

use anyhow::Result;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{Backend, EncourageRequest};
use crate::protocol::{ClassMessage, Id, StudentDoubt};
use crate::speech::Announcer;
use crate::transport::RoomTransport;

const NO_QUESTION: &str = "<NONE>";
const MIN_QUESTION_LEN: usize = 5;

/// Rejects filler and meta-talk the extractor sometimes returns as a question.
pub struct QuestionFilter {
    patterns: Vec<Regex>,
}

impl QuestionFilter {
    pub fn new() -> Result<Self> {
        let patterns = [
            r"^i (have|got) (a|one|some) (doubt|question)s?$",
            r"^i (have|got) one more (doubt|question)$",
            r"^can you hear me$",
            r"^(hi|hello|hey|good (morning|afternoon|evening)) (ma'am|mam|sir|teacher|everyone)$",
            r"^(hi|hello|hey)$",
            r"^one (more )?(doubt|question) please$",
            r"^wait a (second|moment)$",
        ]
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns the trimmed question when it is worth sending.
    pub fn accept(&self, extracted: &str) -> Option<String> {
        let trimmed = extracted.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_QUESTION) {
            return None;
        }

        let normalized = normalize(trimmed);
        if normalized.chars().count() < MIN_QUESTION_LEN {
            debug!("Ignoring short question: {}", trimmed);
            return None;
        }
        if self.patterns.iter().any(|p| p.is_match(&normalized)) {
            debug!("Ignoring meta-talk: {}", trimmed);
            return None;
        }

        Some(trimmed.to_string())
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '?' | '.' | '!'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Student-side voice doubt pipeline.
pub struct VoiceDoubts {
    identity: String,
    filter: QuestionFilter,
    backend: Arc<dyn Backend>,
    transport: Arc<dyn RoomTransport>,
    announcer: Announcer,
}

impl VoiceDoubts {
    pub fn new(
        identity: String,
        backend: Arc<dyn Backend>,
        transport: Arc<dyn RoomTransport>,
        announcer: Announcer,
    ) -> Result<Self> {
        Ok(Self {
            identity,
            filter: QuestionFilter::new()?,
            backend,
            transport,
            announcer,
        })
    }

    /// Tells the teacher a spoken doubt is starting.
    pub async fn recording_started(&self) -> Result<()> {
        self.transport
            .publish(&ClassMessage::VoiceDoubtStart {
                name: self.identity.clone(),
            })
            .await
    }

    /// Ends the recording and sends the extracted question, if any.
    pub async fn recording_finished(&self, transcript: &str) -> Result<Option<StudentDoubt>> {
        self.transport
            .publish(&ClassMessage::VoiceDoubtEnd {
                name: self.identity.clone(),
            })
            .await?;
        self.submit_transcript(transcript).await
    }

    pub async fn submit_transcript(&self, transcript: &str) -> Result<Option<StudentDoubt>> {
        if transcript.trim().is_empty() {
            return Ok(None);
        }

        let extracted = match self.backend.extract_question(transcript).await {
            Ok(response) => response.extracted_question.unwrap_or_default(),
            Err(e) => {
                warn!("Question extraction failed: {}", e);
                return Ok(None);
            }
        };

        let Some(text) = self.filter.accept(&extracted) else {
            return Ok(None);
        };

        info!("Extracted voice doubt: {}", text);
        let doubt = StudentDoubt {
            id: Some(Id::unique()),
            name: self.identity.clone(),
            text,
            voice_generated: true,
        };
        self.transport
            .publish(&ClassMessage::StudentDoubt(doubt.clone()))
            .await?;
        Ok(Some(doubt))
    }

    /// Asks the backend for a word of encouragement and speaks it.
    pub async fn encourage(&self, question: &str) -> Option<String> {
        let request = EncourageRequest {
            name: self.identity.clone(),
            question: question.to_string(),
        };
        match self.backend.encourage_student(&request).await {
            Ok(response) => {
                let text = response.encouragement.filter(|t| !t.trim().is_empty())?;
                self.announcer.announce(text.clone());
                Some(text)
            }
            Err(e) => {
                warn!("Failed to get encouragement: {}", e);
                None
            }
        }
    }
}
