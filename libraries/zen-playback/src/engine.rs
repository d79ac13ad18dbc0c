//! Playback engine
//!
//! Thin state machine over a [`MediaElement`]: source loading, play with retry,
//! pause, seek. Every load and pause bumps a generation counter; async work
//! captures the generation when it starts and discards its own result if the
//! counter has moved on by the time it completes.

use crate::clock::Clock;
use crate::error::{PlaybackError, Result};
use crate::media::MediaElement;
use crate::retry::{self, RetryError, RetryPolicy};
use crate::types::Track;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Media lifecycle as the engine sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No source assigned yet
    Unloaded,

    /// Source assigned, metadata pending
    Loading,

    /// Metadata available
    Ready,

    Playing,
    Paused,

    /// The media resource reported an error
    Errored,
}

/// Notifications raised by the media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Reached the end of the resource
    Ended,

    /// Resource failed (network, decode, missing file)
    Error { message: String },

    /// Duration became known
    LoadedMetadata { duration_secs: f64 },

    /// Playhead moved
    TimeUpdate { current_secs: f64 },

    /// Stalled waiting for data
    Waiting,

    /// Enough data buffered to continue
    CanPlay,

    /// Playback (re)started after a stall
    Playing,
}

pub struct PlaybackEngine {
    media: Rc<dyn MediaElement>,
    clock: Rc<dyn Clock>,
    state: Cell<EngineState>,
    generation: Cell<u64>,
}

impl PlaybackEngine {
    pub fn new(media: Rc<dyn MediaElement>, clock: Rc<dyn Clock>) -> Self {
        Self {
            media,
            clock,
            state: Cell::new(EngineState::Unloaded),
            generation: Cell::new(0),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Current generation; compare against a captured value to detect staleness
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn bump_generation(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    /// Point the media element at `track` and start loading it
    ///
    /// Invalidates any in-flight play request. Returns the new generation.
    pub fn load_track(&self, track: &Track) -> u64 {
        let generation = self.bump_generation();
        debug!("Loading '{}' from {}", track.title, track.source);
        self.media.set_source(&track.source);
        self.media.load();
        self.state.set(EngineState::Loading);
        generation
    }

    /// Load `track` unless the media element already has a source
    ///
    /// Returns true if a load was started.
    pub fn ensure_source(&self, track: &Track) -> bool {
        let missing = self.media.source().map_or(true, |s| s.is_empty());
        if missing {
            self.load_track(track);
        }
        missing
    }

    /// Start playback, retrying rejected attempts under `policy`
    ///
    /// Returns [`PlaybackError::Superseded`] when a load or pause happened
    /// while the request was in flight; the media element is left as the newer
    /// operation wants it.
    pub async fn request_play(&self, policy: &RetryPolicy) -> Result<()> {
        let generation = self.generation.get();
        let media = &self.media;

        let result = retry::attempt(
            &*self.clock,
            policy,
            || self.generation.get() != generation,
            move |attempt_no| {
                trace!("play() attempt {}", attempt_no);
                media.play()
            },
        )
        .await;

        let superseded = self.generation.get() != generation;

        match result {
            Ok(()) if superseded => {
                // A pause landed while play() was pending; honor it
                if self.state.get() == EngineState::Paused {
                    self.media.pause();
                }
                debug!("Discarding play() success for a superseded request");
                Err(PlaybackError::Superseded)
            }
            Ok(()) => {
                self.state.set(EngineState::Playing);
                Ok(())
            }
            Err(RetryError::Cancelled { attempts }) => {
                debug!("Play request cancelled after {} attempts", attempts);
                Err(PlaybackError::Superseded)
            }
            Err(RetryError::Exhausted { .. }) if superseded => Err(PlaybackError::Superseded),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!("Playback failed after {} attempts: {}", attempts, last);
                self.media.pause();
                Err(PlaybackError::PlaybackFailed {
                    attempts,
                    reason: last.to_string(),
                })
            }
        }
    }

    /// Pause immediately
    ///
    /// Invalidates any in-flight play request.
    pub fn pause(&self) {
        self.bump_generation();
        self.media.pause();
        if matches!(
            self.state.get(),
            EngineState::Playing | EngineState::Ready | EngineState::Loading
        ) {
            self.state.set(EngineState::Paused);
        }
    }

    /// Move the playhead; non-finite targets are ignored
    ///
    /// Negative targets clamp to the start. Returns whether the seek was applied.
    pub fn seek(&self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            debug!("Ignoring seek to {}", seconds);
            return false;
        }
        self.media.set_current_time(seconds.max(0.0));
        true
    }

    pub fn current_time(&self) -> f64 {
        self.media.current_time()
    }

    pub fn duration(&self) -> Option<f64> {
        self.media
            .duration()
            .filter(|d| d.is_finite() && *d >= 0.0)
    }

    /// Fold a media notification into the engine state
    pub fn handle_event(&self, event: &MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata { .. } | MediaEvent::CanPlay => {
                if self.state.get() == EngineState::Loading {
                    self.state.set(EngineState::Ready);
                }
            }
            MediaEvent::Error { message } => {
                warn!("Media error: {}", message);
                self.state.set(EngineState::Errored);
            }
            MediaEvent::Ended => {
                if self.state.get() == EngineState::Playing {
                    self.state.set(EngineState::Paused);
                }
            }
            MediaEvent::TimeUpdate { .. } | MediaEvent::Waiting | MediaEvent::Playing => {}
        }
    }
}
