//! Error types for playback control

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The media element rejected every play attempt
    #[error("Playback failed after {attempts} attempts: {reason}")]
    PlaybackFailed { attempts: u32, reason: String },

    /// The media resource faulted on its own (decode error, missing file)
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),

    /// Preferences could not be read or written
    #[error("Preferences unavailable: {0}")]
    PersistenceUnavailable(#[from] StoreError),

    /// Out-of-range volume, non-finite seek, etc.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Index out of bounds
    #[error("Index {index} out of range for playlist of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },

    /// A newer operation took over before this one finished
    #[error("Operation superseded by a newer request")]
    Superseded,

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlaybackError {
    /// The user-facing category, if this error is ever shown to the user
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::PlaybackFailed { .. } => Some(ErrorKind::PlaybackFailed),
            Self::AudioUnavailable(_) => Some(ErrorKind::AudioUnavailable),
            _ => None,
        }
    }
}

/// Error categories surfaced to the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// play() rejected after retries
    PlaybackFailed,
    /// Unsolicited resource error
    AudioUnavailable,
}

impl ErrorKind {
    /// Status line text for the UI
    pub fn label(self) -> &'static str {
        match self {
            Self::PlaybackFailed => "Playback Failed",
            Self::AudioUnavailable => "Audio Unavailable",
        }
    }
}

/// A media or audio-graph primitive rejected a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MediaError(pub String);

impl MediaError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Key-value store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store refused the operation (quota, private mode, ...)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_playback_errors_have_a_user_facing_kind() {
        let failed = PlaybackError::PlaybackFailed {
            attempts: 3,
            reason: "NotAllowedError".to_string(),
        };
        assert_eq!(failed.kind(), Some(ErrorKind::PlaybackFailed));
        assert_eq!(
            PlaybackError::AudioUnavailable("404".to_string()).kind(),
            Some(ErrorKind::AudioUnavailable)
        );
        assert_eq!(PlaybackError::InvalidInput("volume".into()).kind(), None);
        assert_eq!(PlaybackError::Superseded.kind(), None);
    }

    #[test]
    fn store_errors_convert_into_persistence_unavailable() {
        let err: PlaybackError = StoreError::Unavailable("quota exceeded".into()).into();
        assert!(matches!(err, PlaybackError::PersistenceUnavailable(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
