//! Broadcast data messages exchanged over the room's reliable data channel.
//!
//! Every payload is a JSON object with an `action` discriminator. Anything
//! that does not decode into a known action is dropped by the receiver.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::quiz::Quiz;

/// Identifier that arrives either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl Id {
    /// Millisecond timestamp id, used when a doubt arrives without one.
    pub fn now() -> Self {
        Id::Number(chrono::Utc::now().timestamp_millis())
    }

    /// Unique id for doubts created on this client.
    pub fn unique() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Id::Text(format!("{}-{}", millis, &suffix[..7]))
    }

    /// Reads an id from a URL path segment.
    pub fn from_path(segment: &str) -> Self {
        segment
            .parse::<i64>()
            .map(Id::Number)
            .unwrap_or_else(|_| Id::Text(segment.to_string()))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassMessage {
    StudentDoubt(StudentDoubt),
    HandRaise(HandRaise),
    AiAnswerBroadcast(AiAnswer),
    StopAudio,
    QuizStart { quiz: Quiz },
    MeetingEnded,
    VoiceDoubtStart { name: String },
    VoiceDoubtEnd { name: String },
    VideoStart { duration: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDoubt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(
        default,
        rename = "voiceGenerated",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub voice_generated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRaise {
    pub name: String,
    #[serde(default)]
    pub raised: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub answer: Option<String>,
}

impl ClassMessage {
    pub fn action(&self) -> &'static str {
        match self {
            ClassMessage::StudentDoubt(_) => "STUDENT_DOUBT",
            ClassMessage::HandRaise(_) => "HAND_RAISE",
            ClassMessage::AiAnswerBroadcast(_) => "AI_ANSWER_BROADCAST",
            ClassMessage::StopAudio => "STOP_AUDIO",
            ClassMessage::QuizStart { .. } => "QUIZ_START",
            ClassMessage::MeetingEnded => "MEETING_ENDED",
            ClassMessage::VoiceDoubtStart { .. } => "VOICE_DOUBT_START",
            ClassMessage::VoiceDoubtEnd { .. } => "VOICE_DOUBT_END",
            ClassMessage::VideoStart { .. } => "VIDEO_START",
        }
    }

    /// Decodes a data-channel payload. Undecodable payloads yield `None`.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        match serde_json::from_slice(payload) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Ignoring undecodable data message: {}", e);
                None
            }
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn hand_lowered(name: impl Into<String>) -> Self {
        ClassMessage::HandRaise(HandRaise {
            name: name.into(),
            raised: false,
            role: None,
        })
    }
}
