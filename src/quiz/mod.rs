//! Quiz data shared by the teacher and student flows.
//!
//! Scoring happens on the backend; this module only carries quizzes,
//! submission results and aggregated reports.

pub mod results;
pub mod runner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::Id;

pub use results::ResultsPoller;
pub use runner::{Advance, QuizHandle, QuizPhase, QuizRunner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Id,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(
        default,
        rename = "correctAnswer",
        skip_serializing_if = "Option::is_none"
    )]
    pub correct_answer: Option<usize>,
}

impl QuizQuestion {
    /// "B. Mitochondria" style label for the correct option.
    pub fn correct_label(&self) -> Option<String> {
        let index = self.correct_answer?;
        let option = self.options.get(index)?;
        let letter = char::from(b'A' + u8::try_from(index % 26).ok()?);
        Some(format!("{}. {}", letter, option))
    }
}

impl Quiz {
    /// The copy broadcast to students, without correct answers.
    pub fn student_view(&self) -> Quiz {
        Quiz {
            id: self.id.clone(),
            topic: self.topic.clone(),
            questions: self
                .questions
                .iter()
                .map(|q| QuizQuestion {
                    correct_answer: None,
                    ..q.clone()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Per-question outcome computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub student_answer: Option<usize>,
    #[serde(default)]
    pub correct_answer: Option<usize>,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(default)]
    pub results: Vec<QuestionOutcome>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub total_questions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    #[serde(default)]
    pub total_submissions: u32,
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub highest_score: f64,
    #[serde(default)]
    pub lowest_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub total_questions: u32,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Aggregated results for one quiz, as served by `/quiz-results/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizResultsReport {
    #[serde(default)]
    pub stats: QuizStats,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}
