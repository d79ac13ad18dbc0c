/// Player configuration
use crate::error::{PlaybackError, Result};
use crate::fade::FadeStrategy;
use crate::preferences::STORAGE_KEY;
use crate::retry::RetryPolicy;
use crate::types::Track;
use crate::volume::DEFAULT_UNMUTE_LEVEL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment prefix for overrides (`ZEN_FADE__FADE_IN_MS=800`)
pub const ENV_PREFIX: &str = "ZEN";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_playlist")]
    pub playlist: Vec<Track>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub fade: FadeSettings,

    #[serde(default)]
    pub volume: VolumeSettings,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the n-th failure is `base_delay_ms × n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FadeSettings {
    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: u64,

    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,

    #[serde(default)]
    pub strategy: FadeStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct VolumeSettings {
    /// Volume when nothing valid is stored
    #[serde(default = "default_level")]
    pub default_level: f32,

    /// Level restored by unmute when none was remembered
    #[serde(default = "default_level")]
    pub unmute_level: f32,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

impl FadeSettings {
    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }
}

impl PlayerConfig {
    /// Load configuration from an optional file and `ZEN_` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load with a custom environment prefix
    ///
    /// Nested keys use a double underscore: `{PREFIX}_RETRY__MAX_ATTEMPTS`.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from config file if it exists
        if let Some(path) = path.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(track) = self.playlist.iter().find(|t| t.source.trim().is_empty()) {
            return Err(PlaybackError::Config(format!(
                "Track '{}' has no source",
                track.title
            )));
        }

        for (name, level) in [
            ("volume.default_level", self.volume.default_level),
            ("volume.unmute_level", self.volume.unmute_level),
        ] {
            if !(0.0..=1.0).contains(&level) {
                return Err(PlaybackError::Config(format!(
                    "{name} must be within 0.0-1.0, got {level}"
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(PlaybackError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if let FadeStrategy::Stepped { step_ms: 0 } = self.fade.strategy {
            return Err(PlaybackError::Config(
                "fade.strategy.stepped.step_ms must be positive".to_string(),
            ));
        }

        if self.storage_key.is_empty() {
            return Err(PlaybackError::Config("storage_key is empty".to_string()));
        }

        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            playlist: default_playlist(),
            retry: RetrySettings::default(),
            fade: FadeSettings::default(),
            volume: VolumeSettings::default(),
            storage_key: default_storage_key(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            fade_out_ms: default_fade_out_ms(),
            fade_in_ms: default_fade_in_ms(),
            strategy: FadeStrategy::default(),
        }
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            unmute_level: default_level(),
        }
    }
}

// Default values
fn default_playlist() -> Vec<Track> {
    vec![
        Track::new("Zen Garden", "assets/audio/zen-garden.mp3", 180.0),
        Track::new("Bamboo Flute", "assets/audio/bamboo-flute.mp3", 150.0),
        Track::new("Temple Chants", "assets/audio/temple-chants.mp3", 200.0),
    ]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_fade_out_ms() -> u64 {
    300
}

fn default_fade_in_ms() -> u64 {
    500
}

fn default_level() -> f32 {
    DEFAULT_UNMUTE_LEVEL
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}
