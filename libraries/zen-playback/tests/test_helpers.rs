#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;
use zen_playback::headless::{HeadlessGraph, HeadlessMedia};
use zen_playback::{
    Backends, Clock, EventQueue, MemoryStore, Notifier, PlaybackController, PlaybackEvent,
    PlayerConfig, Severity, TokioClock,
};

static INIT: Once = Once::new();

fn init_tracing() {
    // Initialize logging once
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Notifier that records every toast
#[derive(Default)]
pub struct RecordingNotifier {
    toasts: RefCell<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<(String, Severity)> {
        self.toasts.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, message: &str, severity: Severity) {
        self.toasts.borrow_mut().push((message.to_string(), severity));
    }
}

/// Controller wired to headless backends, already initialized
pub struct Harness {
    pub clock: Rc<dyn Clock>,
    pub media: Rc<HeadlessMedia>,
    pub graph: Rc<HeadlessGraph>,
    pub store: Rc<MemoryStore>,
    pub notifier: Rc<RecordingNotifier>,
    pub events: EventQueue,
    pub controller: PlaybackController,
}

impl Harness {
    /// Default playlist (Zen Garden, Bamboo Flute, Temple Chants), empty store
    pub fn new() -> Self {
        Self::build(PlayerConfig::default(), MemoryStore::new(), false)
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        Self::build(config, MemoryStore::new(), false)
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::build(PlayerConfig::default(), store, false)
    }

    /// Audio graph starts suspended, as before a user gesture
    pub fn suspended() -> Self {
        Self::build(PlayerConfig::default(), MemoryStore::new(), true)
    }

    pub fn build(config: PlayerConfig, store: MemoryStore, suspended: bool) -> Self {
        init_tracing();

        let clock: Rc<dyn Clock> = Rc::new(TokioClock::new());
        let media = Rc::new(HeadlessMedia::new(clock.clone()));
        let graph = HeadlessGraph::new(clock.clone());
        let graph = Rc::new(if suspended { graph.suspended() } else { graph });
        let store = Rc::new(store);
        let notifier = Rc::new(RecordingNotifier::default());

        let backends = Backends::new(media.clone(), graph.clone(), store.clone(), clock.clone())
            .with_notifier(notifier.clone());
        let controller =
            PlaybackController::new(config, backends).expect("valid test configuration");

        let events = EventQueue::new();
        controller.subscribe(events.clone());
        controller.initialize();

        Self {
            clock,
            media,
            graph,
            store,
            notifier,
            events,
            controller,
        }
    }

    /// Drain events, keeping only state transitions
    pub fn drain_states(&self) -> Vec<zen_playback::PlaybackState> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                PlaybackEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Stored preferences blob, parsed
    pub fn stored_preferences(&self) -> Option<serde_json::Value> {
        self.store
            .raw(zen_playback::STORAGE_KEY)
            .map(|raw| serde_json::from_str(&raw).expect("stored preferences are JSON"))
    }
}

pub fn approx(actual: f32, expected: f32) -> bool {
    (actual - expected).abs() < 1e-4
}
