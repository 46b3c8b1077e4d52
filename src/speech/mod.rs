//! Spoken announcements.
//!
//! A `Speaker` turns text into audio. The `Announcer` owns the single
//! in-progress utterance: a new announcement interrupts the current one, and
//! `stop` silences it. Interruptions are expected and never surface as errors.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use which::which;

use crate::config::SpeechConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("speech was interrupted")]
    Interrupted,
    #[error("speech was canceled")]
    Canceled,
    #[error("speech is not allowed")]
    NotAllowed,
    #[error("speech synthesis not supported: {0}")]
    Unsupported(String),
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

impl SpeechError {
    /// Interruptions caused by newer speech, or a blocked audio device, are
    /// part of normal operation.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            SpeechError::Interrupted | SpeechError::Canceled | SpeechError::NotAllowed
        )
    }
}

#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speaks `text` until done or until `cancel` fires.
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), SpeechError>;
}

/// Speaks through an external text-to-speech command such as `espeak-ng`.
pub struct CommandSpeaker {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(command: &str, args: Vec<String>) -> Result<Self, SpeechError> {
        let program = which(command).map_err(|e| {
            SpeechError::Unsupported(format!("{} not found in PATH: {}", command, e))
        })?;
        info!("Using speech command {:?}", program);
        Ok(Self { program, args })
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), SpeechError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Failed(e.to_string()))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| SpeechError::Failed(e.to_string()))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SpeechError::Failed(format!("speech command exited with {}", status)))
                }
            }
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop speech command: {}", e);
                }
                Err(SpeechError::Interrupted)
            }
        }
    }
}

/// Used when speech is disabled or no engine is installed.
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str, _cancel: CancellationToken) -> Result<(), SpeechError> {
        debug!("(silent) {}", text);
        Ok(())
    }
}

pub fn speaker_from_config(config: &SpeechConfig) -> Arc<dyn Speaker> {
    if !config.enabled {
        info!("Speech disabled in config");
        return Arc::new(SilentSpeaker);
    }

    match CommandSpeaker::new(&config.command, config.args.clone()) {
        Ok(speaker) => Arc::new(speaker),
        Err(e) => {
            warn!("{}; announcements will be silent", e);
            Arc::new(SilentSpeaker)
        }
    }
}

struct Utterance {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct AnnouncerState {
    generation: u64,
    current: Option<Utterance>,
}

#[derive(Clone)]
pub struct Announcer {
    speaker: Arc<dyn Speaker>,
    state: Arc<Mutex<AnnouncerState>>,
}

impl Announcer {
    pub fn new(speaker: Arc<dyn Speaker>) -> Self {
        Self {
            speaker,
            state: Arc::new(Mutex::new(AnnouncerState::default())),
        }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(SilentSpeaker))
    }

    /// Interrupts any current utterance and speaks `text`, waiting for it to
    /// finish. Expected interruptions resolve as success.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let token = CancellationToken::new();
        let generation = {
            let mut state = self.lock_state();
            state.generation += 1;
            let generation = state.generation;
            let previous = state.current.replace(Utterance {
                generation,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                previous.token.cancel();
            }
            generation
        };

        let result = self.speaker.speak(text, token).await;

        {
            let mut state = self.lock_state();
            if state
                .current
                .as_ref()
                .is_some_and(|u| u.generation == generation)
            {
                state.current = None;
            }
        }

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_expected() => {
                debug!("Announcement ended early: {}", e);
                Ok(())
            }
            Err(e) => {
                error!("Speech error: {}", e);
                Err(e)
            }
        }
    }

    /// Fire-and-forget variant of [`Announcer::speak`].
    pub fn announce(&self, text: impl Into<String>) -> JoinHandle<()> {
        let announcer = self.clone();
        let text = text.into();
        tokio::spawn(async move {
            let _ = announcer.speak(&text).await;
        })
    }

    /// Silences the current utterance immediately.
    pub fn stop(&self) {
        if let Some(utterance) = self.lock_state().current.take() {
            debug!("Stopping current announcement");
            utterance.token.cancel();
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.lock_state().current.is_some()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AnnouncerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
