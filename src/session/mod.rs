//! Role-specific session state and the broadcast reducer.
//!
//! A session is created once per room connection and fixes the local role.
//! Every inbound data message is applied to the session atomically under the
//! `SessionHandle` lock. The reducer owns the hand-raise notifier and the
//! student quiz, and reports lecture cues back to the caller because the
//! lecture controller lives outside the session.

pub mod controller;

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::attendance::{AttendanceTracker, ParticipantRecord};
use crate::backend::{Backend, BackendError};
use crate::config::TimingConfig;
use crate::doubts::{Doubt, DoubtBoard};
use crate::hands::{individual_announcement, HandRaiseNotifier};
use crate::metadata::{Role, SessionMetadata};
use crate::protocol::{AiAnswer, ClassMessage, HandRaise, Id, StudentDoubt};
use crate::quiz::{Quiz, QuizHandle, QuizResultsReport, QuizRunner, ResultsPoller};
use crate::speech::Announcer;

pub use controller::Classroom;

pub const DEFAULT_TOPIC: &str = "General Class";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot resolve a session role from metadata {0:?}")]
    UnknownRole(String),
    #[error("only the {0} can do that")]
    WrongRole(Role),
    #[error("no pending doubt with id {0}")]
    UnknownDoubt(Id),
    #[error("doubt {0} has no answer to send")]
    MissingAnswer(Id),
    #[error("doubt text is empty")]
    EmptyDoubt,
    #[error("raise your hand before asking a doubt")]
    HandNotRaised,
    #[error("no active quiz")]
    NoActiveQuiz,
    #[error("the backend did not return a quiz")]
    QuizNotGenerated,
    #[error("the meeting has ended")]
    MeetingEnded,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to publish to the room: {0}")]
    Transport(String),
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Transport(format!("{:#}", err))
    }
}

/// Lecture side effects the reducer cannot perform itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LectureCue {
    /// Pause a playing lecture, speak the prompt if any, then arm auto-resume.
    Pause { prompt: Option<String> },
    CancelResume,
}

pub struct TeacherState {
    pub attendance: AttendanceTracker,
    pub doubts: DoubtBoard,
    pub hands: HandRaiseNotifier,
    pub ai_panel_open: bool,
    pub loading_doubt: Option<Id>,
    pub quiz: Option<Quiz>,
    pub results: Option<ResultsPoller>,
    pub summary: Option<String>,
    pub meeting_ended: bool,
}

pub struct StudentState {
    pub history: DoubtBoard,
    pub hand_raised: bool,
    pub quiz: Option<QuizHandle>,
    /// Monotonic: once set, never cleared.
    pub meeting_ended: bool,
}

pub enum SessionView {
    Teacher(Box<TeacherState>),
    Student(StudentState),
}

/// Collaborators a session needs to act on its own.
#[derive(Clone)]
pub struct SessionDeps {
    pub announcer: Announcer,
    pub backend: Arc<dyn Backend>,
    pub timing: TimingConfig,
}

pub struct ClassSession {
    identity: String,
    room: String,
    topic: String,
    deps: SessionDeps,
    view: SessionView,
}

impl ClassSession {
    pub fn new(
        identity: &str,
        room: &str,
        metadata: &SessionMetadata,
        deps: SessionDeps,
    ) -> Result<Self, SessionError> {
        let role = metadata
            .role()
            .ok_or_else(|| SessionError::UnknownRole(metadata.role.clone()))?;

        let view = match role {
            Role::Teacher => {
                let mut attendance = AttendanceTracker::new();
                attendance.on_connect(identity, Role::Teacher);
                SessionView::Teacher(Box::new(TeacherState {
                    attendance,
                    doubts: DoubtBoard::new(),
                    hands: HandRaiseNotifier::new(
                        deps.announcer.clone(),
                        deps.timing.hand_batch_threshold,
                        deps.timing.hand_raise_delay(),
                    ),
                    ai_panel_open: false,
                    loading_doubt: None,
                    quiz: None,
                    results: None,
                    summary: None,
                    meeting_ended: false,
                }))
            }
            Role::Student => SessionView::Student(StudentState {
                history: DoubtBoard::new(),
                hand_raised: false,
                quiz: None,
                meeting_ended: false,
            }),
        };

        info!("Session for {} in {} started as {}", identity, room, role);
        Ok(Self {
            identity: identity.to_string(),
            room: room.to_string(),
            topic: metadata.topic.clone(),
            deps,
            view,
        })
    }

    pub fn role(&self) -> Role {
        match self.view {
            SessionView::Teacher(_) => Role::Teacher,
            SessionView::Student(_) => Role::Student,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Topic used for quizzes and reports.
    pub fn quiz_topic(&self) -> &str {
        if self.topic.trim().is_empty() {
            DEFAULT_TOPIC
        } else {
            &self.topic
        }
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn teacher(&self) -> Result<&TeacherState, SessionError> {
        match &self.view {
            SessionView::Teacher(state) => Ok(state),
            SessionView::Student(_) => Err(SessionError::WrongRole(Role::Teacher)),
        }
    }

    pub fn teacher_mut(&mut self) -> Result<&mut TeacherState, SessionError> {
        match &mut self.view {
            SessionView::Teacher(state) => Ok(state),
            SessionView::Student(_) => Err(SessionError::WrongRole(Role::Teacher)),
        }
    }

    pub fn student(&self) -> Result<&StudentState, SessionError> {
        match &self.view {
            SessionView::Student(state) => Ok(state),
            SessionView::Teacher(_) => Err(SessionError::WrongRole(Role::Student)),
        }
    }

    pub fn student_mut(&mut self) -> Result<&mut StudentState, SessionError> {
        match &mut self.view {
            SessionView::Student(state) => Ok(state),
            SessionView::Teacher(_) => Err(SessionError::WrongRole(Role::Student)),
        }
    }

    /// Decodes and applies one data-channel payload. Undecodable payloads
    /// are dropped.
    pub fn handle_payload(&mut self, payload: &[u8]) -> Vec<LectureCue> {
        match ClassMessage::decode(payload) {
            Some(message) => self.apply(message),
            None => Vec::new(),
        }
    }

    pub fn apply(&mut self, message: ClassMessage) -> Vec<LectureCue> {
        debug!("Applying {}", message.action());
        match message {
            ClassMessage::StudentDoubt(doubt) => self.on_student_doubt(doubt),
            ClassMessage::HandRaise(hand) => self.on_hand_raise(hand),
            ClassMessage::AiAnswerBroadcast(answer) => {
                self.on_ai_answer(answer);
                Vec::new()
            }
            ClassMessage::StopAudio => {
                self.deps.announcer.stop();
                Vec::new()
            }
            ClassMessage::QuizStart { quiz } => {
                self.on_quiz_start(quiz);
                Vec::new()
            }
            ClassMessage::MeetingEnded => {
                if let SessionView::Student(state) = &mut self.view {
                    if !state.meeting_ended {
                        info!("Teacher ended the meeting");
                    }
                    state.meeting_ended = true;
                }
                Vec::new()
            }
            ClassMessage::VoiceDoubtStart { name } => match self.view {
                SessionView::Teacher(_) => {
                    debug!("{} started a voice doubt", name);
                    vec![LectureCue::Pause { prompt: None }]
                }
                SessionView::Student(_) => Vec::new(),
            },
            ClassMessage::VoiceDoubtEnd { .. } | ClassMessage::VideoStart { .. } => Vec::new(),
        }
    }

    fn on_student_doubt(&mut self, doubt: StudentDoubt) -> Vec<LectureCue> {
        let SessionView::Teacher(state) = &mut self.view else {
            return Vec::new();
        };
        let name = doubt.name.clone();
        let id = state.doubts.receive(doubt);
        info!("Doubt {} received from {}", id, name);
        vec![LectureCue::CancelResume]
    }

    fn on_hand_raise(&mut self, hand: HandRaise) -> Vec<LectureCue> {
        match &mut self.view {
            SessionView::Teacher(state) => {
                if hand.raised {
                    let prompt = state
                        .hands
                        .raise(&hand.name)
                        .map(|name| individual_announcement(&name));
                    vec![LectureCue::Pause { prompt }]
                } else {
                    state.hands.lower(&hand.name);
                    Vec::new()
                }
            }
            SessionView::Student(state) => {
                if hand.name == self.identity {
                    state.hand_raised = hand.raised;
                }
                Vec::new()
            }
        }
    }

    fn on_ai_answer(&mut self, answer: AiAnswer) {
        match &mut self.view {
            SessionView::Teacher(state) => {
                state.doubts.merge_answer(&answer);
                state.ai_panel_open = true;
            }
            SessionView::Student(state) => state.history.merge_answer(&answer),
        }

        if let Some(text) = answer.answer.as_deref().filter(|a| !a.trim().is_empty()) {
            self.deps.announcer.announce(format!(
                "{} asked: {}. The answer is: {}",
                answer.name, answer.text, text
            ));
        }
    }

    fn on_quiz_start(&mut self, quiz: Quiz) {
        let SessionView::Student(state) = &mut self.view else {
            return;
        };
        if state.meeting_ended {
            debug!("Ignoring quiz {} after the meeting ended", quiz.id);
            return;
        }
        info!("Quiz {} started ({} questions)", quiz.id, quiz.len());
        let runner = QuizRunner::new(quiz, self.deps.timing.quiz_question_seconds);
        state.quiz = Some(QuizHandle::spawn(
            runner,
            Arc::clone(&self.deps.backend),
            self.identity.clone(),
        ));
    }

    /// Remote participant joined. Participants without a declared role count
    /// as students.
    pub fn participant_connected(&mut self, identity: &str, metadata: &str) -> bool {
        let role = SessionMetadata::read(metadata).participant_role();
        match &mut self.view {
            SessionView::Teacher(state) => state.attendance.on_connect(identity, role),
            SessionView::Student(_) => false,
        }
    }

    pub fn participant_disconnected(&mut self, identity: &str) -> bool {
        match &mut self.view {
            SessionView::Teacher(state) => state.attendance.on_disconnect(identity),
            SessionView::Student(_) => false,
        }
    }

    /// Teacher keeps the generated quiz and starts polling its results.
    pub fn quiz_generated(&mut self, quiz: Quiz) -> Result<(), SessionError> {
        let backend = Arc::clone(&self.deps.backend);
        let period = self.deps.timing.quiz_results_poll();
        let state = self.teacher_mut()?;
        state.results = Some(ResultsPoller::spawn(backend, quiz.id.clone(), period));
        state.quiz = Some(quiz);
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = chrono::Utc::now();
        match &self.view {
            SessionView::Teacher(state) => SessionSnapshot::Teacher(TeacherSnapshot {
                identity: self.identity.clone(),
                room: self.room.clone(),
                topic: self.topic.clone(),
                pending: state.doubts.pending().to_vec(),
                history: state.doubts.history().to_vec(),
                unread: state.doubts.unread_count(),
                hand_queue: state.hands.queue().identities().to_vec(),
                ai_panel_open: state.ai_panel_open,
                loading_doubt: state.loading_doubt.clone(),
                attendance: state
                    .attendance
                    .records()
                    .iter()
                    .map(|record| AttendanceEntry {
                        elapsed_ms: record.elapsed_ms(now),
                        record: record.clone(),
                    })
                    .collect(),
                quiz: state.quiz.clone(),
                quiz_results: state.results.as_ref().and_then(|r| r.latest()),
                summary: state.summary.clone(),
                meeting_ended: state.meeting_ended,
            }),
            SessionView::Student(state) => SessionSnapshot::Student(StudentSnapshot {
                identity: self.identity.clone(),
                room: self.room.clone(),
                hand_raised: state.hand_raised,
                history: state.history.history().to_vec(),
                quiz: state.quiz.as_ref().map(|q| q.snapshot()),
                meeting_ended: state.meeting_ended,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: ParticipantRecord,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSnapshot {
    pub identity: String,
    pub room: String,
    pub topic: String,
    pub pending: Vec<Doubt>,
    pub history: Vec<Doubt>,
    pub unread: usize,
    pub hand_queue: Vec<String>,
    pub ai_panel_open: bool,
    pub loading_doubt: Option<Id>,
    pub attendance: Vec<AttendanceEntry>,
    pub quiz: Option<Quiz>,
    pub quiz_results: Option<QuizResultsReport>,
    pub summary: Option<String>,
    pub meeting_ended: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub identity: String,
    pub room: String,
    pub hand_raised: bool,
    pub history: Vec<Doubt>,
    pub quiz: Option<QuizRunner>,
    pub meeting_ended: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum SessionSnapshot {
    Teacher(TeacherSnapshot),
    Student(StudentSnapshot),
}

/// Shared handle to the one session of this process.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<ClassSession>>,
}

impl SessionHandle {
    pub fn new(session: ClassSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ClassSession> {
        self.inner.lock().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn role(&self) -> Role {
        self.inner.lock().await.role()
    }
}
