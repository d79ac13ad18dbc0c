//! Playback controller - core orchestration
//!
//! Coordinates the track registry, playback engine, fade controller, volume
//! and persisted preferences. Owns the user-visible [`PlaybackState`] and
//! reports every change to subscribed listeners.
//!
//! The controller is a cheap `Clone` handle over shared single-threaded state.
//! Transport operations that wait (play, track changes) are `async`; several
//! may be in flight at once. Their completions check the engine generation and
//! back off if a newer load or pause has taken over.

use crate::clock::Clock;
use crate::config::PlayerConfig;
use crate::engine::{MediaEvent, PlaybackEngine};
use crate::error::{ErrorKind, PlaybackError, Result};
use crate::events::{Listeners, LogNotifier, Notifier, PlaybackEvent, PlaybackListener, Severity};
use crate::fade::{FadeController, FadeOutcome};
use crate::format::{format_time, progress_percent};
use crate::media::{AudioGraph, MediaElement};
use crate::preferences::{KeyValueStore, PersistedPreferences};
use crate::registry::TrackRegistry;
use crate::retry::RetryPolicy;
use crate::shortcuts::KeyCommand;
use crate::types::{PlaybackState, PlayerSnapshot, Position, Track};
use crate::volume::VolumeState;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Toast shown when play() is rejected after every retry
pub const PLAYBACK_FAILED_TOAST: &str = "Playback failed. Please check your connection.";

/// Toast shown when the media resource faults on its own
pub const AUDIO_UNAVAILABLE_TOAST: &str = "Audio unavailable";

/// Host-provided collaborators
pub struct Backends {
    pub media: Rc<dyn MediaElement>,
    pub graph: Rc<dyn AudioGraph>,
    pub store: Rc<dyn KeyValueStore>,
    pub clock: Rc<dyn Clock>,
    pub notifier: Rc<dyn Notifier>,
}

impl Backends {
    /// Collaborators with toasts going to the log
    pub fn new(
        media: Rc<dyn MediaElement>,
        graph: Rc<dyn AudioGraph>,
        store: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            media,
            graph,
            store,
            clock,
            notifier: Rc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

struct Inner {
    registry: TrackRegistry,
    engine: PlaybackEngine,
    fader: FadeController,
    graph: Rc<dyn AudioGraph>,
    preferences: PersistedPreferences,
    notifier: Rc<dyn Notifier>,
    listeners: Listeners,

    retry: RetryPolicy,
    fade_out: Duration,
    fade_in: Duration,
    default_level: f32,
    unmute_level: f32,

    state: Cell<PlaybackState>,
    index: Cell<usize>,
    volume: RefCell<VolumeState>,
    error: RefCell<Option<(ErrorKind, String)>>,

    /// Media stalled waiting for data
    buffering: Cell<bool>,

    /// Seek bar drag in progress
    scrubbing: Cell<bool>,
}

/// Playlist player
#[derive(Clone)]
pub struct PlaybackController {
    inner: Rc<Inner>,
}

impl PlaybackController {
    /// Create a controller over `backends`
    ///
    /// Nothing is loaded until [`initialize`](Self::initialize).
    pub fn new(config: PlayerConfig, backends: Backends) -> Result<Self> {
        config.validate()?;

        let Backends {
            media,
            graph,
            store,
            clock,
            notifier,
        } = backends;

        let volume = VolumeState::new(config.volume.default_level)
            .with_unmute_fallback(config.volume.unmute_level);

        let inner = Inner {
            registry: TrackRegistry::new(config.playlist),
            engine: PlaybackEngine::new(media, clock.clone()),
            fader: FadeController::new(graph.clone(), clock, config.fade.strategy),
            graph,
            preferences: PersistedPreferences::with_key(store, config.storage_key),
            notifier,
            listeners: Listeners::default(),
            retry: config.retry.policy(),
            fade_out: config.fade.fade_out(),
            fade_in: config.fade.fade_in(),
            default_level: config.volume.default_level,
            unmute_level: config.volume.unmute_level,
            state: Cell::new(PlaybackState::Idle),
            index: Cell::new(0),
            volume: RefCell::new(volume),
            error: RefCell::new(None),
            buffering: Cell::new(false),
            scrubbing: Cell::new(false),
        };

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    /// Restore preferences and load the current track (paused)
    ///
    /// An empty playlist leaves the player Idle; every later operation is then
    /// a no-op.
    pub fn initialize(&self) {
        let inner = &self.inner;
        if inner.registry.is_empty() {
            error!("Playlist is empty; player stays idle");
            self.set_state(PlaybackState::Idle);
            return;
        }

        let stored = inner.preferences.load(inner.registry.len());
        let index = stored.track_index.unwrap_or(0);
        let level = stored.volume.unwrap_or(inner.default_level);
        debug!("Restored preferences: volume {:.2}, track {}", level, index);

        *inner.volume.borrow_mut() = VolumeState::new(level).with_unmute_fallback(inner.unmute_level);
        inner.index.set(index);

        if let Ok(track) = inner.registry.get(index) {
            inner.engine.load_track(track);
            self.emit_track_changed(index, track);
        }
        inner.graph.set_gain_now(level);
        self.emit_volume();
        self.emit_position();
    }

    /// Subscribe to playback events
    pub fn subscribe(&self, listener: impl PlaybackListener + 'static) {
        self.inner.listeners.add(Rc::new(listener));
    }

    /// Start or resume playback
    ///
    /// With `with_fade` the gain starts at silence and ramps to the user volume
    /// once the media element is playing. Returns
    /// [`PlaybackError::PlaybackFailed`] after every retry was rejected; the
    /// failure has already been reported to listeners and the notifier.
    pub async fn play(&self, with_fade: bool) -> Result<()> {
        let inner = &self.inner;
        if inner.registry.is_empty() {
            return Ok(());
        }

        if inner.graph.is_suspended() {
            if let Err(e) = inner.graph.resume().await {
                warn!("Failed to resume audio graph: {}", e);
            }
        }

        let track = inner.registry.get(inner.index.get())?;
        inner.engine.ensure_source(track);

        let target = self.effective_gain();
        inner.graph.set_gain_now(if with_fade { 0.0 } else { target });

        self.set_state(PlaybackState::Loading);
        let generation = inner.engine.generation();

        match inner.engine.request_play(&inner.retry).await {
            Ok(()) => {}
            Err(PlaybackError::Superseded) => return Ok(()),
            Err(err @ PlaybackError::PlaybackFailed { .. }) => {
                self.fail(&err);
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        self.clear_error();

        if !with_fade {
            self.set_state(PlaybackState::Playing);
            return Ok(());
        }

        self.set_state(PlaybackState::Fading);
        let outcome = inner
            .fader
            .fade_between(0.0, self.effective_gain(), inner.fade_in)
            .await;
        if outcome == FadeOutcome::Skipped {
            debug!("Fade-in skipped; setting gain directly");
        }

        if inner.engine.generation() != generation {
            // Paused or switched while fading in
            return Ok(());
        }

        // Settle on the volume as it is now: it may have changed mid-fade
        inner.graph.set_gain_now(self.effective_gain());
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Pause immediately
    ///
    /// Any in-flight fade stops where it is.
    pub fn pause(&self) {
        let inner = &self.inner;
        if inner.registry.is_empty() {
            return;
        }
        inner.engine.pause();
        inner.fader.cancel();
        if matches!(
            inner.state.get(),
            PlaybackState::Playing | PlaybackState::Fading | PlaybackState::Loading
        ) {
            self.set_state(PlaybackState::Paused);
        }
    }

    /// Pause if playing, fading or waiting on a play request; otherwise play
    /// with a fade-in
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let state = self.state();
        if state.is_playing() || state == PlaybackState::Loading {
            self.pause();
            Ok(())
        } else {
            self.play(true).await
        }
    }

    /// Set the user volume
    ///
    /// Levels outside [0, 1] are ignored and return false. The gain follows
    /// immediately unless a fade is running or the player is muted.
    pub fn set_volume(&self, level: f32) -> bool {
        let inner = &self.inner;
        let (accepted, muted) = {
            let mut volume = inner.volume.borrow_mut();
            (volume.set_user_volume(level), volume.is_muted())
        };
        if let Err(e) = accepted {
            debug!("Ignoring volume change: {}", e);
            return false;
        }

        if !muted && !inner.fader.is_busy() && inner.state.get() != PlaybackState::Fading {
            inner.graph.set_gain_now(level);
        }

        inner.preferences.save(level, inner.index.get());
        self.emit_volume();
        true
    }

    /// Mute, remembering the audible gain, or restore it
    ///
    /// Muting mid-fade remembers the user volume rather than the momentary
    /// ramp value: that is where the gain was heading.
    pub fn toggle_mute(&self) {
        let inner = &self.inner;
        let muted = inner.volume.borrow().is_muted();

        if muted {
            let restore = inner.volume.borrow_mut().unmute();
            inner.graph.set_gain_now(restore);
        } else {
            let fading = inner.fader.is_busy() || inner.state.get() == PlaybackState::Fading;
            inner.fader.cancel();
            let audible = if fading {
                self.volume()
            } else {
                inner.graph.gain()
            };
            inner.volume.borrow_mut().mute(audible);
            inner.graph.set_gain_now(0.0);
        }

        self.emit_volume();
    }

    /// Advance to the next track, wrapping to the first
    pub async fn next_track(&self) -> Result<()> {
        self.change_track(Direction::Next).await
    }

    /// Go back to the previous track, wrapping to the last
    pub async fn previous_track(&self) -> Result<()> {
        self.change_track(Direction::Previous).await
    }

    /// Media reached the end of the current track
    pub async fn on_track_ended(&self) -> Result<()> {
        self.next_track().await
    }

    /// Move the playhead; non-finite positions are ignored
    pub fn seek(&self, seconds: f64) -> bool {
        if self.inner.registry.is_empty() {
            return false;
        }
        let applied = self.inner.engine.seek(seconds);
        if applied {
            self.emit_position();
        }
        applied
    }

    /// Seek bar drag started; position updates pause until it ends
    pub fn begin_scrub(&self) {
        self.inner.scrubbing.set(true);
    }

    /// Time label for a drag position
    pub fn scrub_preview(&self, seconds: f64) -> String {
        let clamped = match self.inner.engine.duration() {
            Some(duration) if seconds.is_finite() => seconds.clamp(0.0, duration),
            _ => seconds,
        };
        format_time(clamped)
    }

    /// Seek bar released at `seconds`
    pub fn end_scrub(&self, seconds: f64) -> bool {
        self.inner.scrubbing.set(false);
        self.seek(seconds)
    }

    pub fn is_scrubbing(&self) -> bool {
        self.inner.scrubbing.get()
    }

    /// Feed a media element notification into the controller
    pub async fn handle_media_event(&self, event: MediaEvent) -> Result<()> {
        let inner = &self.inner;
        inner.engine.handle_event(&event);

        match event {
            MediaEvent::Ended => return self.on_track_ended().await,
            MediaEvent::Error { message } => {
                if matches!(
                    inner.state.get(),
                    PlaybackState::Playing | PlaybackState::Loading | PlaybackState::Fading
                ) {
                    self.fail(&PlaybackError::AudioUnavailable(message));
                } else {
                    debug!("Media error while {:?}: {}", inner.state.get(), message);
                }
            }
            MediaEvent::LoadedMetadata { .. } | MediaEvent::TimeUpdate { .. } => {
                self.emit_position();
            }
            MediaEvent::Waiting => self.set_buffering(true),
            MediaEvent::CanPlay | MediaEvent::Playing => self.set_buffering(false),
        }
        Ok(())
    }

    /// Run a keyboard command
    ///
    /// Transport commands are executed; UI-only commands (help overlay) are
    /// handed back for the caller to apply.
    pub async fn handle_command(&self, command: KeyCommand) -> Result<Option<KeyCommand>> {
        if command.is_ui_only() {
            return Ok(Some(command));
        }
        match command {
            KeyCommand::TogglePlayPause => self.toggle_play_pause().await?,
            KeyCommand::NextTrack => self.next_track().await?,
            KeyCommand::PreviousTrack => self.previous_track().await?,
            KeyCommand::ToggleHelp | KeyCommand::CloseHelp => {}
        }
        Ok(None)
    }

    // ===== State accessors =====

    pub fn state(&self) -> PlaybackState {
        self.inner.state.get()
    }

    pub fn current_index(&self) -> usize {
        self.inner.index.get()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.inner.registry.get(self.inner.index.get()).ok()
    }

    pub fn tracks(&self) -> &[Track] {
        self.inner.registry.tracks()
    }

    /// User volume (0.0-1.0)
    pub fn volume(&self) -> f32 {
        self.inner.volume.borrow().user_volume()
    }

    pub fn is_muted(&self) -> bool {
        self.inner.volume.borrow().is_muted()
    }

    /// Visible error, if any
    pub fn error(&self) -> Option<ErrorKind> {
        self.inner.error.borrow().as_ref().map(|(kind, _)| *kind)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.get() == PlaybackState::Loading || self.inner.buffering.get()
    }

    pub fn position(&self) -> Position {
        Position {
            track_index: self.inner.index.get(),
            current_secs: self.inner.engine.current_time(),
            duration_secs: self.inner.engine.duration(),
        }
    }

    /// Everything a renderer needs, in one value
    pub fn snapshot(&self) -> PlayerSnapshot {
        let inner = &self.inner;
        let state = inner.state.get();
        let volume = inner.volume.borrow();
        PlayerSnapshot {
            state,
            is_playing: state.is_playing(),
            is_loading: self.is_loading(),
            track_index: inner.index.get(),
            current_track_title: self.current_track().map(|t| t.title.clone()),
            current_time_secs: inner.engine.current_time(),
            total_duration_secs: inner.engine.duration(),
            progress_percent: progress_percent(
                inner.engine.current_time(),
                inner.engine.duration().unwrap_or(0.0),
            ),
            volume_level: volume.user_volume(),
            is_muted: volume.is_muted(),
            error_message: self.error().map(|kind| kind.label().to_string()),
        }
    }

    // ===== Internals =====

    async fn change_track(&self, direction: Direction) -> Result<()> {
        let inner = &self.inner;
        if inner.registry.is_empty() {
            return Ok(());
        }

        if inner.state.get().is_playing() {
            self.set_state(PlaybackState::Fading);
            inner.fader.fade_to(0.0, inner.fade_out).await;
        }

        // Re-check after the fade: a pause may have landed meanwhile
        let active = matches!(
            inner.state.get(),
            PlaybackState::Playing | PlaybackState::Fading | PlaybackState::Loading
        );

        let current = inner.index.get();
        let target = match direction {
            Direction::Next => inner.registry.next(current),
            Direction::Previous => inner.registry.previous(current),
        };
        let Some(index) = target else {
            return Ok(());
        };

        self.switch_track(index)?;

        if active {
            self.play(true).await
        } else {
            if inner.state.get() != PlaybackState::Idle {
                self.set_state(PlaybackState::Paused);
            }
            Ok(())
        }
    }

    fn switch_track(&self, index: usize) -> Result<()> {
        let inner = &self.inner;
        let track = inner.registry.get(index)?;

        inner.index.set(index);
        inner.engine.load_track(track);
        inner.buffering.set(false);
        info!("Track {}: {}", index, track.title);

        inner.preferences.save(self.volume(), index);
        self.emit_track_changed(index, track);
        self.emit_position();
        self.clear_error();
        Ok(())
    }

    fn effective_gain(&self) -> f32 {
        self.inner.volume.borrow().effective_gain()
    }

    fn set_state(&self, state: PlaybackState) {
        let inner = &self.inner;
        let was_loading = self.is_loading();
        if inner.state.replace(state) == state {
            return;
        }
        self.emit(&PlaybackEvent::StateChanged { state });

        let is_loading = self.is_loading();
        if is_loading != was_loading {
            self.emit(&PlaybackEvent::LoadingChanged { is_loading });
        }
    }

    fn set_buffering(&self, buffering: bool) {
        let was_loading = self.is_loading();
        self.inner.buffering.set(buffering);
        let is_loading = self.is_loading();
        if is_loading != was_loading {
            self.emit(&PlaybackEvent::LoadingChanged { is_loading });
        }
    }

    /// Surface an error once: state, listeners, toast
    fn fail(&self, err: &PlaybackError) {
        let Some(kind) = err.kind() else {
            debug!("Not surfacing internal error: {}", err);
            return;
        };
        let message = err.to_string();
        *self.inner.error.borrow_mut() = Some((kind, message.clone()));
        self.set_state(PlaybackState::Errored);
        self.emit(&PlaybackEvent::Error {
            kind,
            message,
        });

        let toast = match kind {
            ErrorKind::PlaybackFailed => PLAYBACK_FAILED_TOAST,
            ErrorKind::AudioUnavailable => AUDIO_UNAVAILABLE_TOAST,
        };
        self.inner.notifier.show(toast, Severity::Error);
    }

    fn clear_error(&self) {
        let cleared = self.inner.error.borrow_mut().take().is_some();
        if cleared {
            self.emit(&PlaybackEvent::ErrorCleared);
        }
    }

    fn emit(&self, event: &PlaybackEvent) {
        self.inner.listeners.emit(event);
    }

    fn emit_track_changed(&self, index: usize, track: &Track) {
        self.emit(&PlaybackEvent::TrackChanged {
            index,
            title: track.title.clone(),
        });
    }

    fn emit_volume(&self) {
        let (level, is_muted) = {
            let volume = self.inner.volume.borrow();
            (volume.user_volume(), volume.is_muted())
        };
        self.emit(&PlaybackEvent::VolumeChanged { level, is_muted });
    }

    fn emit_position(&self) {
        if self.inner.scrubbing.get() {
            return;
        }
        let position = self.position();
        self.emit(&PlaybackEvent::PositionChanged {
            current_secs: position.current_secs,
            duration_secs: position.duration_secs,
        });
    }
}
