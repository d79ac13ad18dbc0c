//! Playback Events
//!
//! Event-based communication for UI synchronization during playback.
//! Events are delivered synchronously, in emission order, to every subscribed
//! listener. Emitted at:
//! - State changes (loading, playing, paused, fading, errored)
//! - Track changes (next/previous/track end)
//! - Position updates (media `timeupdate`, metadata)
//! - Volume and mute changes
//! - Errors raised and cleared

use crate::error::ErrorKind;
use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, warn};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Playback state changed
    StateChanged {
        /// The new playback state
        state: PlaybackState,
    },

    /// A different track is now current
    TrackChanged {
        /// Index of the new track
        index: usize,
        /// Title to display
        title: String,
    },

    /// Playhead or known duration changed
    #[serde(rename_all = "camelCase")]
    PositionChanged {
        current_secs: f64,
        /// `None` until metadata is known
        duration_secs: Option<f64>,
    },

    /// Loading indicator should be shown or hidden
    #[serde(rename_all = "camelCase")]
    LoadingChanged { is_loading: bool },

    /// Volume or mute changed
    #[serde(rename_all = "camelCase")]
    VolumeChanged {
        /// User volume (0.0-1.0)
        level: f32,
        /// Whether audio is muted
        is_muted: bool,
    },

    /// An error became visible
    Error {
        kind: ErrorKind,
        /// Error message
        message: String,
    },

    /// The visible error went away
    ErrorCleared,
}

/// Receives playback events
///
/// Any `Fn(&PlaybackEvent)` closure is a listener.
pub trait PlaybackListener {
    fn on_event(&self, event: &PlaybackEvent);
}

impl<F> PlaybackListener for F
where
    F: Fn(&PlaybackEvent),
{
    fn on_event(&self, event: &PlaybackEvent) {
        self(event);
    }
}

/// Listener that buffers events until drained
///
/// Clones share one buffer: subscribe one clone, drain the other.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<Vec<PlaybackEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered event, oldest first
    pub fn drain(&self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl PlaybackListener for EventQueue {
    fn on_event(&self, event: &PlaybackEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Transient user-facing message sink (toasts)
pub trait Notifier {
    fn show(&self, message: &str, severity: Severity);
}

/// Notifier that writes toasts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!(target: "zen_playback::toast", "{}", message),
            Severity::Warning => warn!(target: "zen_playback::toast", "{}", message),
            Severity::Error => error!(target: "zen_playback::toast", "{}", message),
        }
    }
}

/// Fan-out to every subscribed listener
#[derive(Default)]
pub(crate) struct Listeners {
    listeners: RefCell<Vec<Rc<dyn PlaybackListener>>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Rc<dyn PlaybackListener>) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Deliver `event` to every listener
    ///
    /// The list is snapshotted first so a listener may subscribe another
    /// listener (or call back into the controller) without a borrow conflict.
    pub(crate) fn emit(&self, event: &PlaybackEvent) {
        let listeners: Vec<_> = self.listeners.borrow().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}
