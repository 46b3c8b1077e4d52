use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Overrides `backend.base_url` when set.
pub const BACKEND_URL_ENV: &str = "CLASSROOM_BACKEND_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub bridge: BridgeConfig,
    pub api: ApiConfig,
    pub speech: SpeechConfig,
    pub timing: TimingConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

/// The local bridge that owns the video SDK connection.
/// Outbound broadcasts go to `{base_url}/publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Text-to-speech command; the announcement text is passed as the last argument.
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub hand_raise_delay_ms: u64,
    pub hand_batch_threshold: usize,
    pub quiz_question_seconds: u32,
    pub meeting_end_grace_ms: u64,
    pub lecture_resume_seconds: u64,
    pub quiz_results_poll_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7881".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3939 }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak-ng".to_string(),
            args: Vec::new(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hand_raise_delay_ms: 3000,
            hand_batch_threshold: 5,
            quiz_question_seconds: 30,
            meeting_end_grace_ms: 800,
            lecture_resume_seconds: 15,
            quiz_results_poll_seconds: 3,
        }
    }
}

impl TimingConfig {
    pub fn hand_raise_delay(&self) -> Duration {
        Duration::from_millis(self.hand_raise_delay_ms)
    }

    pub fn meeting_end_grace(&self) -> Duration {
        Duration::from_millis(self.meeting_end_grace_ms)
    }

    pub fn lecture_resume(&self) -> Duration {
        Duration::from_secs(self.lecture_resume_seconds)
    }

    pub fn quiz_results_poll(&self) -> Duration {
        Duration::from_secs(self.quiz_results_poll_seconds.max(1))
    }
}

impl ExportConfig {
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => global::reports_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Self =
                toml::from_str(&content).context("Failed to parse config file")?;
            info!("Loaded config from {:?}", config_path);
            config
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Using backend URL from {}: {}", BACKEND_URL_ENV, url);
                self.backend.base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_matches_classroom_constants() {
        let timing = TimingConfig::default();
        assert_eq!(timing.hand_raise_delay(), Duration::from_secs(3));
        assert_eq!(timing.hand_batch_threshold, 5);
        assert_eq!(timing.quiz_question_seconds, 30);
        assert_eq!(timing.meeting_end_grace(), Duration::from_millis(800));
        assert_eq!(timing.lecture_resume(), Duration::from_secs(15));
        assert_eq!(timing.quiz_results_poll(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "https://school.example.com"

            [timing]
            hand_batch_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "https://school.example.com");
        assert_eq!(config.backend.request_timeout_seconds, 30);
        assert_eq!(config.timing.hand_batch_threshold, 3);
        assert_eq!(config.timing.hand_raise_delay_ms, 3000);
        assert_eq!(config.api.port, 3939);
        assert!(config.speech.enabled);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.bridge.base_url, config.bridge.base_url);
        assert_eq!(parsed.speech.command, "espeak-ng");
    }

    #[test]
    fn test_quiz_results_poll_never_zero() {
        let timing = TimingConfig {
            quiz_results_poll_seconds: 0,
            ..TimingConfig::default()
        };
        assert_eq!(timing.quiz_results_poll(), Duration::from_secs(1));
    }
}
