use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{ClassSession, LectureCue, SessionDeps, SessionError, SessionHandle, SessionSnapshot};
use crate::backend::{Backend, GenerateQuizRequest, SummaryRequest};
use crate::config::TimingConfig;
use crate::doubts::Doubt;
use crate::export;
use crate::lecture::{LectureController, LectureState, Playback};
use crate::metadata::Role;
use crate::protocol::{AiAnswer, ClassMessage, HandRaise, Id, StudentDoubt};
use crate::quiz::{Quiz, QuizResultsReport, QuizRunner};
use crate::speech::Announcer;
use crate::transport::RoomTransport;
use crate::voice::VoiceDoubts;

const NO_ANSWER: &str = "No answer received.";

/// Drives one classroom session: inbound broadcasts, participant events and
/// every outbound operation of the local participant.
#[derive(Clone)]
pub struct Classroom {
    session: SessionHandle,
    backend: Arc<dyn Backend>,
    transport: Arc<dyn RoomTransport>,
    announcer: Announcer,
    lecture: Arc<Mutex<LectureController>>,
    voice: Option<Arc<VoiceDoubts>>,
    timing: TimingConfig,
    reports_dir: PathBuf,
}

impl Classroom {
    pub fn new(
        session: ClassSession,
        deps: SessionDeps,
        transport: Arc<dyn RoomTransport>,
        playback: Arc<dyn Playback>,
        reports_dir: PathBuf,
    ) -> Result<Self> {
        let voice = match session.role() {
            Role::Student => Some(Arc::new(VoiceDoubts::new(
                session.identity().to_string(),
                Arc::clone(&deps.backend),
                Arc::clone(&transport),
                deps.announcer.clone(),
            )?)),
            Role::Teacher => None,
        };
        let lecture = LectureController::new(playback, deps.timing.lecture_resume());

        Ok(Self {
            session: SessionHandle::new(session),
            backend: deps.backend,
            transport,
            announcer: deps.announcer,
            lecture: Arc::new(Mutex::new(lecture)),
            voice,
            timing: deps.timing,
            reports_dir,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot().await
    }

    pub async fn role(&self) -> Role {
        self.session.role().await
    }

    // Inbound

    /// Applies one data-channel payload and carries out its lecture cues.
    pub async fn handle_payload(&self, payload: &[u8]) {
        let cues = self.session.lock().await.handle_payload(payload);
        self.run_cues(cues).await;
    }

    pub async fn handle_message(&self, message: ClassMessage) {
        let cues = self.session.lock().await.apply(message);
        self.run_cues(cues).await;
    }

    async fn run_cues(&self, cues: Vec<LectureCue>) {
        for cue in cues {
            let mut lecture = self.lecture.lock().await;
            match cue {
                LectureCue::Pause { prompt } => match lecture.pause_for_question().await {
                    Ok(true) => match prompt {
                        Some(prompt) => {
                            // Spoken now; the notifier must not repeat it.
                            if let Ok(state) = self.session.lock().await.teacher_mut() {
                                state.hands.claim_announcement();
                            }
                            let spoken = self.announcer.announce(prompt);
                            lecture.arm_resume_after(async move {
                                let _ = spoken.await;
                            });
                        }
                        None => lecture.arm_resume(),
                    },
                    Ok(false) => {}
                    Err(e) => warn!("Failed to pause lecture: {:#}", e),
                },
                LectureCue::CancelResume => {
                    lecture.cancel_resume();
                }
            }
        }
    }

    pub async fn participant_connected(&self, identity: &str, metadata: &str) {
        if self
            .session
            .lock()
            .await
            .participant_connected(identity, metadata)
        {
            info!("{} joined", identity);
        }
    }

    pub async fn participant_disconnected(&self, identity: &str) {
        if self.session.lock().await.participant_disconnected(identity) {
            info!("{} left", identity);
        }
    }

    // Teacher

    /// Asks the backend about a pending doubt and keeps the answer locally.
    pub async fn ask_ai(&self, id: &Id) -> Result<String, SessionError> {
        let question = {
            let mut session = self.session.lock().await;
            let state = session.teacher_mut()?;
            let text = state
                .doubts
                .pending_doubt(id)
                .map(|d| d.text.clone())
                .ok_or_else(|| SessionError::UnknownDoubt(id.clone()))?;
            state.loading_doubt = Some(id.clone());
            text
        };

        let response = self.backend.ask_ai(&question).await;

        let mut session = self.session.lock().await;
        let state = session.teacher_mut()?;
        if state.loading_doubt.as_ref() == Some(id) {
            state.loading_doubt = None;
        }

        match response {
            Ok(response) => {
                let answer = response
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                if !state.doubts.set_local_answer(id, answer.clone()) {
                    debug!("Doubt {} resolved while waiting for its answer", id);
                }
                Ok(answer)
            }
            Err(e) => {
                error!("Failed to get AI answer for doubt {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Broadcasts the stored answer of a pending doubt to the room.
    pub async fn send_to_student(&self, id: &Id) -> Result<(), SessionError> {
        let message = {
            let session = self.session.lock().await;
            let doubt = session
                .teacher()?
                .doubts
                .pending_doubt(id)
                .ok_or_else(|| SessionError::UnknownDoubt(id.clone()))?;
            let answer = doubt
                .answer
                .clone()
                .filter(|a| !a.trim().is_empty())
                .ok_or_else(|| SessionError::MissingAnswer(id.clone()))?;
            ClassMessage::AiAnswerBroadcast(AiAnswer {
                id: Some(doubt.id.clone()),
                name: doubt.name.clone(),
                text: doubt.text.clone(),
                answer: Some(answer),
            })
        };

        self.transport.publish(&message).await?;
        self.session
            .lock()
            .await
            .teacher_mut()?
            .doubts
            .mark_broadcasting(id);
        info!("Answer for doubt {} sent to the class", id);
        Ok(())
    }

    /// Closes a doubt and lowers the asker's hand for everyone.
    pub async fn resolve_doubt(&self, id: &Id) -> Result<Doubt, SessionError> {
        let doubt = {
            let mut session = self.session.lock().await;
            let state = session.teacher_mut()?;
            let doubt = state
                .doubts
                .resolve(id)
                .ok_or_else(|| SessionError::UnknownDoubt(id.clone()))?;
            state.hands.lower(&doubt.name);
            doubt
        };

        self.transport
            .publish(&ClassMessage::hand_lowered(doubt.name.clone()))
            .await?;
        info!("Doubt {} from {} resolved", id, doubt.name);
        Ok(doubt)
    }

    pub async fn update_doubt_text(&self, id: &Id, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyDoubt);
        }
        let mut session = self.session.lock().await;
        if session.teacher_mut()?.doubts.update_text(id, text) {
            Ok(())
        } else {
            Err(SessionError::UnknownDoubt(id.clone()))
        }
    }

    /// Silences answer announcements in the whole room.
    pub async fn stop_ai_audio(&self) -> Result<(), SessionError> {
        self.session.lock().await.teacher()?;
        self.announcer.stop();
        self.transport.publish(&ClassMessage::StopAudio).await?;
        Ok(())
    }

    /// Builds a quiz from the questions asked so far, starts it for the
    /// students and then fetches the class summary.
    pub async fn generate_quiz(&self) -> Result<Quiz, SessionError> {
        let (request, summary_request) = {
            let session = self.session.lock().await;
            let state = session.teacher()?;
            let questions = state.doubts.questions();
            let topic = session.quiz_topic().to_string();
            (
                GenerateQuizRequest {
                    topic: topic.clone(),
                    student_questions: questions.clone(),
                    room_name: session.room().to_string(),
                },
                SummaryRequest {
                    topic,
                    student_questions: questions,
                },
            )
        };

        info!(
            "Generating quiz on {} from {} questions",
            request.topic,
            request.student_questions.len()
        );
        let response = self.backend.generate_quiz(&request).await.map_err(|e| {
            error!("Failed to generate quiz: {}", e);
            SessionError::Backend(e)
        })?;
        let quiz_id = response.quiz_id.ok_or(SessionError::QuizNotGenerated)?;
        let quiz = Quiz {
            id: quiz_id,
            topic: request.topic.clone(),
            questions: response.questions,
        };

        self.transport
            .publish(&ClassMessage::QuizStart {
                quiz: quiz.student_view(),
            })
            .await?;
        self.session.lock().await.quiz_generated(quiz.clone())?;
        info!("Quiz {} started with {} questions", quiz.id, quiz.len());

        match self.backend.generate_summary(&summary_request).await {
            Ok(response) => {
                if let Some(summary) = response.summary {
                    self.session.lock().await.teacher_mut()?.summary = Some(summary);
                }
            }
            Err(e) => warn!("Failed to generate class summary: {}", e),
        }

        Ok(quiz)
    }

    /// Latest polled results of the generated quiz.
    pub async fn quiz_results(&self) -> Result<Option<QuizResultsReport>, SessionError> {
        let session = self.session.lock().await;
        let state = session.teacher()?;
        let results = state.results.as_ref().ok_or(SessionError::NoActiveQuiz)?;
        Ok(results.latest())
    }

    /// Tells the students, waits for the broadcast to land, tears the room
    /// down and leaves. Backend failure still disconnects.
    pub async fn end_meeting(&self) -> Result<(), SessionError> {
        let room = {
            let mut session = self.session.lock().await;
            let room = session.room().to_string();
            let state = session.teacher_mut()?;
            if state.meeting_ended {
                return Err(SessionError::MeetingEnded);
            }
            state.meeting_ended = true;
            state.results = None;
            room
        };

        if let Err(e) = self.transport.publish(&ClassMessage::MeetingEnded).await {
            warn!("Failed to broadcast meeting end: {:#}", e);
        }
        tokio::time::sleep(self.timing.meeting_end_grace()).await;

        if let Err(e) = self.backend.end_room(&room).await {
            error!("Failed to end room {}: {}", room, e);
        }
        self.lecture.lock().await.cancel_resume();
        self.announcer.stop();
        self.transport.disconnect().await?;
        info!("Meeting {} ended", room);
        Ok(())
    }

    // Student

    /// Flips the local hand and tells the room. Returns the new state.
    pub async fn toggle_hand(&self) -> Result<bool, SessionError> {
        let (name, raised) = {
            let session = self.session.lock().await;
            let state = session.student()?;
            if state.meeting_ended {
                return Err(SessionError::MeetingEnded);
            }
            (session.identity().to_string(), !state.hand_raised)
        };

        self.transport
            .publish(&ClassMessage::HandRaise(HandRaise {
                name,
                raised,
                role: Some(Role::Student.as_str().to_string()),
            }))
            .await?;
        self.session.lock().await.student_mut()?.hand_raised = raised;
        Ok(raised)
    }

    pub async fn ask_doubt(&self, text: &str) -> Result<StudentDoubt, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyDoubt);
        }
        let name = {
            let session = self.session.lock().await;
            let state = session.student()?;
            if state.meeting_ended {
                return Err(SessionError::MeetingEnded);
            }
            if !state.hand_raised {
                return Err(SessionError::HandNotRaised);
            }
            session.identity().to_string()
        };

        let doubt = StudentDoubt {
            id: Some(Id::unique()),
            name,
            text: text.to_string(),
            voice_generated: false,
        };
        self.transport
            .publish(&ClassMessage::StudentDoubt(doubt.clone()))
            .await?;
        info!("Doubt sent: {}", doubt.text);
        Ok(doubt)
    }

    pub async fn voice_started(&self) -> Result<(), SessionError> {
        let voice = self.voice()?;
        voice.recording_started().await?;
        Ok(())
    }

    /// Turns a finished voice transcript into a doubt and encourages the
    /// student when one was found.
    pub async fn submit_transcript(
        &self,
        transcript: &str,
    ) -> Result<Option<StudentDoubt>, SessionError> {
        let voice = self.voice()?;
        let doubt = voice.recording_finished(transcript).await?;
        if let Some(doubt) = &doubt {
            let voice = Arc::clone(&voice);
            let question = doubt.text.clone();
            tokio::spawn(async move {
                voice.encourage(&question).await;
            });
        }
        Ok(doubt)
    }

    fn voice(&self) -> Result<Arc<VoiceDoubts>, SessionError> {
        self.voice
            .clone()
            .ok_or(SessionError::WrongRole(Role::Student))
    }

    /// Queues an answer selection. The quiz task applies it asynchronously;
    /// once the answers are submitted further commands are ignored.
    pub async fn quiz_select(&self, option: usize) -> Result<(), SessionError> {
        let session = self.session.lock().await;
        let quiz = session
            .student()?
            .quiz
            .as_ref()
            .ok_or(SessionError::NoActiveQuiz)?;
        if !quiz.select(option).await {
            debug!("Quiz already submitted, ignoring selection");
        }
        Ok(())
    }

    pub async fn quiz_next(&self) -> Result<(), SessionError> {
        let session = self.session.lock().await;
        let quiz = session
            .student()?
            .quiz
            .as_ref()
            .ok_or(SessionError::NoActiveQuiz)?;
        if !quiz.next().await {
            debug!("Quiz already submitted, ignoring next");
        }
        Ok(())
    }

    pub async fn quiz_state(&self) -> Result<QuizRunner, SessionError> {
        let session = self.session.lock().await;
        let quiz = session
            .student()?
            .quiz
            .as_ref()
            .ok_or(SessionError::NoActiveQuiz)?;
        Ok(quiz.snapshot())
    }

    pub async fn quiz_close(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        let state = session.student_mut()?;
        state.quiz.take().ok_or(SessionError::NoActiveQuiz)?;
        Ok(())
    }

    // Lecture

    pub async fn lecture_state(&self) -> LectureState {
        self.lecture.lock().await.state()
    }

    pub async fn lecture_load(&self, duration: f64) -> Result<LectureState, SessionError> {
        self.session.lock().await.teacher()?;
        let mut lecture = self.lecture.lock().await;
        lecture.load(duration);
        Ok(lecture.state())
    }

    pub async fn lecture_start(&self) -> Result<bool, SessionError> {
        self.session.lock().await.teacher()?;
        let started = self
            .lecture
            .lock()
            .await
            .start(self.transport.as_ref())
            .await?;
        Ok(started)
    }

    /// Resumes the video by hand, dropping any pending auto-resume.
    pub async fn lecture_play(&self) -> Result<bool, SessionError> {
        self.session.lock().await.teacher()?;
        Ok(self.lecture.lock().await.play().await?)
    }

    pub async fn lecture_pause(&self) -> Result<bool, SessionError> {
        self.session.lock().await.teacher()?;
        Ok(self.lecture.lock().await.pause().await?)
    }

    pub async fn lecture_ended(&self) -> Result<(), SessionError> {
        self.session.lock().await.teacher()?;
        self.lecture.lock().await.ended();
        Ok(())
    }

    // Reports

    /// Writes the attendance report and returns its path.
    pub async fn export_class_report(&self, output: Option<&Path>) -> Result<PathBuf> {
        let report = {
            let session = self.session.lock().await;
            let state = session.teacher()?;
            export::ClassReport::collect(
                &state.attendance,
                &state.doubts,
                session.quiz_topic(),
                state.summary.as_deref(),
                chrono::Local::now(),
            )
        };
        let path = self.report_path(output, &report.file_name());
        export::write_sheet(&report.sheet(), &path)
            .with_context(|| format!("Failed to write class report to {}", path.display()))?;
        info!("Class report written to {}", path.display());
        Ok(path)
    }

    /// Writes the results of the generated quiz and returns the file path.
    pub async fn export_quiz_report(&self, output: Option<&Path>) -> Result<PathBuf> {
        let report = {
            let session = self.session.lock().await;
            let state = session.teacher()?;
            let quiz = state.quiz.as_ref().ok_or(SessionError::NoActiveQuiz)?;
            let results = state
                .results
                .as_ref()
                .and_then(|r| r.latest())
                .context("No quiz results received yet")?;
            export::QuizReport {
                topic: quiz.topic.clone(),
                date: chrono::Local::now(),
                results,
            }
        };
        let path = self.report_path(output, &report.file_name());
        export::write_sheet(&report.sheet(), &path)
            .with_context(|| format!("Failed to write quiz report to {}", path.display()))?;
        info!("Quiz report written to {}", path.display());
        Ok(path)
    }

    fn report_path(&self, output: Option<&Path>, file_name: &str) -> PathBuf {
        match output {
            Some(path) if path.is_dir() => path.join(file_name),
            Some(path) => path.to_path_buf(),
            None => self.reports_dir.join(file_name),
        }
    }
}
