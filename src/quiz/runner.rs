//! Student-side quiz countdown.
//!
//! `QuizRunner` is the pure state machine: one countdown per question, reset
//! on every index change, expiry forcing a "next". Advancing past the last
//! question produces the submission payload exactly once. `QuizHandle` drives
//! a runner on a tokio task with a one-second ticker and submits through the
//! backend.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{Quiz, QuizResult};
use crate::backend::{Backend, SubmitQuizRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum QuizPhase {
    Answering,
    Submitting,
    Submitted { result: Option<QuizResult> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at this index.
    Next(usize),
    /// The quiz is finished; submit these answers.
    Submit(Vec<Option<usize>>),
    /// Nothing to do: the quiz is no longer being answered.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRunner {
    quiz: Quiz,
    current_index: usize,
    time_left: u32,
    question_seconds: u32,
    answers: Vec<Option<usize>>,
    phase: QuizPhase,
}

impl QuizRunner {
    pub fn new(quiz: Quiz, question_seconds: u32) -> Self {
        let question_seconds = question_seconds.max(1);
        Self {
            answers: vec![None; quiz.questions.len()],
            quiz,
            current_index: 0,
            time_left: question_seconds,
            question_seconds,
            phase: QuizPhase::Answering,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    pub fn is_answering(&self) -> bool {
        self.phase == QuizPhase::Answering
    }

    fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.quiz.questions.len()
    }

    /// Records an answer for the current question. Ignored once submitting.
    pub fn select(&mut self, option: usize) -> bool {
        if !self.is_answering() {
            return false;
        }
        let Some(question) = self.quiz.questions.get(self.current_index) else {
            return false;
        };
        if option >= question.options.len() {
            debug!("Option {} out of range for question {}", option, self.current_index);
            return false;
        }
        self.answers[self.current_index] = Some(option);
        true
    }

    /// One second elapsed. Expiry behaves exactly like [`QuizRunner::advance`].
    pub fn tick(&mut self) -> Option<Advance> {
        if !self.is_answering() {
            return None;
        }
        if self.time_left <= 1 {
            self.time_left = 0;
            return Some(self.advance());
        }
        self.time_left -= 1;
        None
    }

    pub fn advance(&mut self) -> Advance {
        if !self.is_answering() {
            return Advance::Ignored;
        }
        if self.is_last_question() {
            self.phase = QuizPhase::Submitting;
            return Advance::Submit(self.answers_payload());
        }
        self.current_index += 1;
        self.time_left = self.question_seconds;
        Advance::Next(self.current_index)
    }

    /// One slot per question in order, `None` where unanswered.
    pub fn answers_payload(&self) -> Vec<Option<usize>> {
        self.answers.clone()
    }

    pub fn complete(&mut self, result: Option<QuizResult>) {
        self.phase = QuizPhase::Submitted { result };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizCommand {
    Select(usize),
    Next,
}

/// Owns the task driving one quiz. Dropping the handle abandons the quiz.
pub struct QuizHandle {
    commands: mpsc::Sender<QuizCommand>,
    snapshot: watch::Receiver<QuizRunner>,
    task: JoinHandle<()>,
}

impl QuizHandle {
    pub fn spawn(
        runner: QuizRunner,
        backend: Arc<dyn Backend>,
        student_name: String,
    ) -> Self {
        let (commands, rx) = mpsc::channel(16);
        let (updates, snapshot) = watch::channel(runner.clone());
        let task = tokio::spawn(run_quiz(runner, rx, backend, student_name, updates));
        Self {
            commands,
            snapshot,
            task,
        }
    }

    pub async fn select(&self, option: usize) -> bool {
        self.commands.send(QuizCommand::Select(option)).await.is_ok()
    }

    pub async fn next(&self) -> bool {
        self.commands.send(QuizCommand::Next).await.is_ok()
    }

    pub fn snapshot(&self) -> QuizRunner {
        self.snapshot.borrow().clone()
    }

    /// Resolves once the quiz is submitted or abandoned.
    pub async fn finished(&mut self) -> QuizRunner {
        let _ = self
            .snapshot
            .wait_for(|r| matches!(r.phase, QuizPhase::Submitted { .. }))
            .await;
        self.snapshot()
    }
}

impl Drop for QuizHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_quiz(
    mut runner: QuizRunner,
    mut commands: mpsc::Receiver<QuizCommand>,
    backend: Arc<dyn Backend>,
    student_name: String,
    updates: watch::Sender<QuizRunner>,
) {
    info!(
        "Starting quiz {} with {} questions",
        runner.quiz.id,
        runner.quiz.len()
    );

    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut step = if runner.quiz.is_empty() {
        Some(runner.advance())
    } else {
        None
    };

    loop {
        match step.take() {
            Some(Advance::Submit(answers)) => {
                updates.send_replace(runner.clone());
                let result = submit(&*backend, &runner.quiz, &student_name, answers).await;
                runner.complete(result);
                updates.send_replace(runner);
                return;
            }
            Some(Advance::Next(index)) => {
                debug!("Quiz advanced to question {}", index + 1);
                ticker.reset();
            }
            Some(Advance::Ignored) | None => {}
        }
        updates.send_replace(runner.clone());

        step = tokio::select! {
            _ = ticker.tick() => runner.tick(),
            command = commands.recv() => match command {
                Some(QuizCommand::Select(option)) => {
                    runner.select(option);
                    None
                }
                Some(QuizCommand::Next) => Some(runner.advance()),
                None => {
                    debug!("Quiz {} abandoned", runner.quiz.id);
                    return;
                }
            },
        };
    }
}

async fn submit(
    backend: &dyn Backend,
    quiz: &Quiz,
    student_name: &str,
    answers: Vec<Option<usize>>,
) -> Option<QuizResult> {
    let request = SubmitQuizRequest {
        quiz_id: quiz.id.clone(),
        student_name: student_name.to_string(),
        answers,
    };
    match backend.submit_quiz(&request).await {
        Ok(result) => {
            info!(
                "Quiz {} submitted: {}/{} correct",
                quiz.id, result.correct_count, result.total_questions
            );
            Some(result)
        }
        Err(e) => {
            warn!("Failed to submit quiz {}: {}", quiz.id, e);
            None
        }
    }
}
