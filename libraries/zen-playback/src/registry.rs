//! Fixed, ordered playlist with wrap-around navigation

use crate::error::{PlaybackError, Result};
use crate::types::Track;

/// Immutable playlist
///
/// Navigation wraps in both directions. An empty registry has no valid index,
/// so `next`/`previous` return `None` and callers treat that as a no-op.
#[derive(Debug, Clone, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Track at `index`
    pub fn get(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(PlaybackError::IndexOutOfRange {
            index,
            len: self.tracks.len(),
        })
    }

    /// Index after `index`, wrapping from the last track to the first
    pub fn next(&self, index: usize) -> Option<usize> {
        let len = self.tracks.len();
        (len > 0).then(|| (index % len + 1) % len)
    }

    /// Index before `index`, wrapping from the first track to the last
    pub fn previous(&self, index: usize) -> Option<usize> {
        let len = self.tracks.len();
        (len > 0).then(|| (index % len + len - 1) % len)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}
