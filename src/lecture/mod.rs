//! Teacher-side class video.
//!
//! A raised hand or a starting voice doubt pauses a playing lecture and arms
//! an auto-resume timer. A received doubt cancels the timer; so does the end
//! of the video. The timer only resumes a lecture that is still paused,
//! started and not ended. Playing the video by hand drops the timer too.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::protocol::ClassMessage;
use crate::schedule::ScheduledTask;
use crate::transport::{BridgeTransport, RoomTransport};

#[async_trait]
pub trait Playback: Send + Sync {
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
}

#[async_trait]
impl Playback for BridgeTransport {
    async fn play(&self) -> Result<()> {
        self.command("/video/play").await
    }

    async fn pause(&self) -> Result<()> {
        self.command("/video/pause").await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureState {
    pub loaded: bool,
    pub started: bool,
    pub playing: bool,
    pub ended: bool,
    pub duration: f64,
}

impl LectureState {
    fn should_resume(&self) -> bool {
        self.started && !self.playing && !self.ended
    }
}

pub struct LectureController {
    state: Arc<Mutex<LectureState>>,
    playback: Arc<dyn Playback>,
    resume: ScheduledTask,
    resume_after: Duration,
}

impl LectureController {
    pub fn new(playback: Arc<dyn Playback>, resume_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LectureState::default())),
            playback,
            resume: ScheduledTask::new(),
            resume_after,
        }
    }

    pub fn state(&self) -> LectureState {
        self.lock().clone()
    }

    /// A new video resets the class.
    pub fn load(&mut self, duration: f64) {
        self.resume.cancel();
        *self.lock() = LectureState {
            loaded: true,
            duration,
            ..LectureState::default()
        };
        info!("Lecture loaded ({:.0}s)", duration);
    }

    /// Starts playback once and tells the students. Returns false when there
    /// is nothing to start.
    pub async fn start(&mut self, transport: &dyn RoomTransport) -> Result<bool> {
        let duration = {
            let state = self.lock();
            if !state.loaded || state.started {
                return Ok(false);
            }
            state.duration
        };

        self.playback.play().await?;
        {
            let mut state = self.lock();
            state.started = true;
            state.playing = true;
            state.ended = false;
        }
        transport
            .publish(&ClassMessage::VideoStart { duration })
            .await?;
        info!("Class started");
        Ok(true)
    }

    /// Pauses a playing lecture. Returns true when it was playing.
    pub async fn pause_for_question(&mut self) -> Result<bool> {
        {
            let state = self.lock();
            if !state.started || !state.playing || state.ended {
                return Ok(false);
            }
        }

        self.playback.pause().await?;
        self.lock().playing = false;
        debug!("Lecture paused for a question");
        Ok(true)
    }

    /// Arms the auto-resume timer, replacing any previous one.
    pub fn arm_resume(&mut self) {
        self.arm_resume_after(async {});
    }

    /// Arms the auto-resume timer once `prompt` finishes, so the countdown
    /// starts after the hand-raise prompt has been spoken. A doubt arriving
    /// during the prompt cancels it as well.
    pub fn arm_resume_after<F>(&mut self, prompt: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let playback = Arc::clone(&self.playback);
        let after = self.resume_after;

        self.resume.schedule_after(prompt, after, async move {
            let resume = state
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .should_resume();
            if !resume {
                return;
            }
            info!("No doubt after {}s, resuming lecture", after.as_secs());
            match playback.play().await {
                Ok(()) => state.lock().unwrap_or_else(|p| p.into_inner()).playing = true,
                Err(e) => warn!("Auto-resume failed: {}", e),
            }
        });
    }

    /// Teacher resumed the video by hand. Any pending auto-resume is dropped.
    /// Returns false when the lecture is not running or already playing.
    pub async fn play(&mut self) -> Result<bool> {
        self.cancel_resume();
        {
            let state = self.lock();
            if !state.started || state.ended || state.playing {
                return Ok(false);
            }
        }

        self.playback.play().await?;
        self.lock().playing = true;
        info!("Lecture resumed by the teacher");
        Ok(true)
    }

    /// Teacher paused the video by hand. No auto-resume is armed.
    pub async fn pause(&mut self) -> Result<bool> {
        {
            let state = self.lock();
            if !state.started || state.ended || !state.playing {
                return Ok(false);
            }
        }

        self.cancel_resume();
        self.playback.pause().await?;
        self.lock().playing = false;
        info!("Lecture paused by the teacher");
        Ok(true)
    }

    pub fn cancel_resume(&mut self) -> bool {
        let canceled = self.resume.cancel();
        if canceled {
            debug!("Auto-resume canceled");
        }
        canceled
    }

    pub fn resume_pending(&self) -> bool {
        self.resume.is_pending()
    }

    pub fn ended(&mut self) {
        self.resume.cancel();
        let mut state = self.lock();
        state.ended = true;
        state.playing = false;
        info!("Lecture ended");
    }

    fn lock(&self) -> MutexGuard<'_, LectureState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
