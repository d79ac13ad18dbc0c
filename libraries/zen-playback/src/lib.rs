//! Zen Player - Playback Control
//!
//! Platform-agnostic playlist playback for the Zen Player widget.
//!
//! This crate provides:
//! - Fixed playlist navigation with wrap-around (next/previous/track end)
//! - Play with retry and linear backoff
//! - Gain fades: fade-out before a track switch, fade-in after play starts
//! - Volume and mute (linear gain, 0.0-1.0)
//! - Persisted preferences (volume + track index)
//! - Seeking and seek bar scrubbing
//! - Keyboard shortcut mapping
//! - Observer events and render snapshots
//!
//! # Architecture
//!
//! `zen-playback` never touches a browser API directly:
//! - Media playback goes through [`MediaElement`]
//! - The gain stage goes through [`AudioGraph`]
//! - Preferences go through [`KeyValueStore`]
//! - Timers go through [`Clock`]
//!
//! The `wasm` feature provides browser implementations of all four and a
//! `WasmAudioPlayer` for JavaScript. [`headless`] provides in-process ones.
//!
//! Everything runs on one thread: collaborators are shared through `Rc` and
//! async operations are `?Send`.
//!
//! # Example: Basic Playback
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use zen_playback::headless::{HeadlessGraph, HeadlessMedia};
//! use zen_playback::{Backends, Clock, MemoryStore, PlaybackController, PlayerConfig, TokioClock};
//!
//! # async fn example() -> zen_playback::Result<()> {
//! let clock: Rc<dyn Clock> = Rc::new(TokioClock::new());
//! let backends = Backends::new(
//!     Rc::new(HeadlessMedia::new(clock.clone())),
//!     Rc::new(HeadlessGraph::new(clock.clone())),
//!     Rc::new(MemoryStore::new()),
//!     clock,
//! );
//!
//! let player = PlaybackController::new(PlayerConfig::default(), backends)?;
//! player.initialize();
//!
//! // Fade in, then skip ahead with a fade-out
//! player.play(true).await?;
//! player.set_volume(0.8);
//! player.next_track().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Observing Events
//!
//! ```rust,no_run
//! use zen_playback::{EventQueue, PlaybackController, PlaybackEvent};
//!
//! # fn example(player: &PlaybackController) {
//! // Closures are listeners
//! player.subscribe(|event: &PlaybackEvent| println!("{event:?}"));
//!
//! // Or buffer events and drain them per frame
//! let queue = EventQueue::new();
//! player.subscribe(queue.clone());
//! for event in queue.drain() {
//!     println!("{event:?}");
//! }
//! # }
//! ```

mod clock;
mod config;
mod controller;
mod engine;
mod error;
mod events;
mod fade;
pub mod format;
pub mod headless;
mod media;
mod preferences;
mod registry;
mod retry;
pub mod shortcuts;
pub mod types;
mod volume;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
#[cfg(feature = "tokio")]
pub use clock::TokioClock;
pub use clock::Clock;
pub use config::{FadeSettings, PlayerConfig, RetrySettings, VolumeSettings, ENV_PREFIX};
pub use controller::{
    Backends, PlaybackController, AUDIO_UNAVAILABLE_TOAST, PLAYBACK_FAILED_TOAST,
};
pub use engine::{EngineState, MediaEvent, PlaybackEngine};
pub use error::{ErrorKind, MediaError, PlaybackError, Result, StoreError};
pub use events::{EventQueue, LogNotifier, Notifier, PlaybackEvent, PlaybackListener, Severity};
pub use fade::{ramp_value, FadeController, FadeOutcome, FadeStrategy};
pub use media::{AudioGraph, MediaElement};
pub use preferences::{
    JsonFileStore, KeyValueStore, MemoryStore, PersistedPreferences, StoredPreferences,
    STORAGE_KEY,
};
pub use registry::TrackRegistry;
pub use retry::{attempt, Backoff, RetryError, RetryPolicy};
pub use shortcuts::KeyCommand;
pub use types::{PlaybackState, PlayerSnapshot, Position, Track};
pub use volume::{clamp_gain, VolumeState, DEFAULT_UNMUTE_LEVEL};

#[cfg(feature = "wasm")]
pub use wasm::WasmAudioPlayer;
