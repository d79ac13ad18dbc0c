//! Core types for playback control

use serde::{Deserialize, Serialize};

/// A playlist entry
///
/// Immutable once the playlist is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track title shown in the UI
    pub title: String,

    /// URI or path handed to the media element
    pub source: String,

    /// Nominal length in seconds (the real duration arrives with metadata)
    #[serde(default)]
    pub duration_secs: f64,
}

impl Track {
    pub fn new(title: impl Into<String>, source: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            duration_secs,
        }
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing started yet (or empty playlist)
    Idle,

    /// Play requested, waiting for the media element to start
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Playing while the gain ramps (track transition or fade-in)
    Fading,

    /// Last play attempt or the media resource failed
    Errored,
}

impl PlaybackState {
    /// Whether audio is (or is about to be) coming out of the speakers
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Fading)
    }
}

/// Where playback currently is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub track_index: usize,
    pub current_secs: f64,
    /// `None` until the media element reports metadata
    pub duration_secs: Option<f64>,
}

/// Everything a renderer needs to draw the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub is_loading: bool,
    pub track_index: usize,
    pub current_track_title: Option<String>,
    pub current_time_secs: f64,
    pub total_duration_secs: Option<f64>,
    /// Seek bar fill, 0-100
    pub progress_percent: f64,
    pub volume_level: f32,
    pub is_muted: bool,
    pub error_message: Option<String>,
}
