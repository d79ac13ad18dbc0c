//! WASM-compatible player wrapper

use super::backend::{CallbackNotifier, LocalStorageStore, TimeoutClock, WebGraph, WebMedia};
use crate::{
    format, Backends, KeyCommand, MediaEvent, PlaybackController, PlaybackError, PlaybackEvent,
    PlayerConfig,
};
use js_sys::{Function, Promise};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Event, HtmlAudioElement};

/// Media element events forwarded into the controller
const MEDIA_EVENTS: [&str; 7] = [
    "ended",
    "error",
    "loadedmetadata",
    "timeupdate",
    "waiting",
    "canplay",
    "playing",
];

fn to_js(error: PlaybackError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Browser audio player
///
/// Wraps the core PlaybackController with a JavaScript-friendly API. Async
/// transport methods return promises that reject with the error message.
#[wasm_bindgen]
pub struct WasmAudioPlayer {
    controller: PlaybackController,
    on_event: Rc<RefCell<Option<Function>>>,
    on_toast: Rc<RefCell<Option<Function>>>,

    // Kept alive for as long as the player; the element holds raw references
    _media_listeners: Vec<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
impl WasmAudioPlayer {
    /// Create a player driving `element`
    ///
    /// `config` is an optional `PlayerConfig`-shaped object; omitted fields
    /// take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(element: HtmlAudioElement, config: JsValue) -> Result<WasmAudioPlayer, JsValue> {
        // Enable panic hooks for better error messages in console
        console_error_panic_hook::set_once();

        let config: PlayerConfig = if config.is_undefined() || config.is_null() {
            PlayerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid player config: {}", e)))?
        };

        let graph = WebGraph::new(&element)?;
        let store = LocalStorageStore::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let on_toast = Rc::new(RefCell::new(None));

        let backends = Backends::new(
            Rc::new(WebMedia::new(element.clone())),
            Rc::new(graph),
            Rc::new(store),
            Rc::new(TimeoutClock::new()),
        )
        .with_notifier(Rc::new(CallbackNotifier::new(on_toast.clone())));

        let controller = PlaybackController::new(config, backends).map_err(to_js)?;

        let on_event: Rc<RefCell<Option<Function>>> = Rc::new(RefCell::new(None));
        let callback = on_event.clone();
        controller.subscribe(move |event: &PlaybackEvent| {
            // Clone out so the callback may re-register itself
            let Some(cb) = callback.borrow().clone() else {
                return;
            };
            match serde_wasm_bindgen::to_value(event) {
                Ok(value) => {
                    let _ = cb.call1(&JsValue::NULL, &value);
                }
                Err(e) => debug!("Failed to serialize event: {}", e),
            }
        });

        let media_listeners = wire_media_events(&element, &controller)?;
        controller.initialize();

        Ok(Self {
            controller,
            on_event,
            on_toast,
            _media_listeners: media_listeners,
        })
    }

    // ===== Playback Control =====

    /// Start playback with a fade-in
    pub fn play(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.play(true).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.controller.pause();
    }

    #[wasm_bindgen(js_name = togglePlayPause)]
    pub fn toggle_play_pause(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.toggle_play_pause().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Skip to next track
    #[wasm_bindgen(js_name = nextTrack)]
    pub fn next_track(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.next_track().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Go to previous track
    #[wasm_bindgen(js_name = previousTrack)]
    pub fn previous_track(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.previous_track().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    // ===== Volume Control =====

    /// Set volume (0.0 - 1.0); returns false if out of range
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f32) -> bool {
        self.controller.set_volume(level)
    }

    #[wasm_bindgen(js_name = getVolume)]
    pub fn get_volume(&self) -> f32 {
        self.controller.volume()
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.controller.toggle_mute();
    }

    #[wasm_bindgen(js_name = isMuted)]
    pub fn is_muted(&self) -> bool {
        self.controller.is_muted()
    }

    // ===== Seeking =====

    /// Seek to position in seconds
    pub fn seek(&self, seconds: f64) -> bool {
        self.controller.seek(seconds)
    }

    #[wasm_bindgen(js_name = beginScrub)]
    pub fn begin_scrub(&self) {
        self.controller.begin_scrub();
    }

    /// Time label for a seek bar drag position
    #[wasm_bindgen(js_name = scrubPreview)]
    pub fn scrub_preview(&self, seconds: f64) -> String {
        self.controller.scrub_preview(seconds)
    }

    #[wasm_bindgen(js_name = endScrub)]
    pub fn end_scrub(&self, seconds: f64) -> bool {
        self.controller.end_scrub(seconds)
    }

    // ===== Keyboard =====

    /// Handle a `keydown`
    ///
    /// Resolves to `"toggle_help"` / `"close_help"` for commands the page
    /// must apply itself, `null` otherwise.
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&self, code: &str, key: &str, target_is_text_input: bool) -> Promise {
        let command = KeyCommand::from_key(code, key, target_is_text_input);
        let controller = self.controller.clone();
        future_to_promise(async move {
            let Some(command) = command else {
                return Ok(JsValue::NULL);
            };
            let handed_back = controller.handle_command(command).await.map_err(to_js)?;
            Ok(handed_back.map_or(JsValue::NULL, |c| JsValue::from_str(c.as_str())))
        })
    }

    // ===== State Queries =====

    /// Everything the UI renders, as a plain object
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.controller.snapshot())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Playlist as an array of `{title, source, duration_secs}`
    pub fn tracks(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.controller.tracks()).unwrap_or(JsValue::NULL)
    }

    // ===== Event Listeners =====

    /// Register the playback event callback
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: Function) {
        *self.on_event.borrow_mut() = Some(callback);
    }

    /// Register the toast callback `(message, severity)`
    #[wasm_bindgen(js_name = onToast)]
    pub fn on_toast(&self, callback: Function) {
        *self.on_toast.borrow_mut() = Some(callback);
    }
}

// ===== Display helpers =====

/// `m:ss` label for a time in seconds
#[wasm_bindgen(js_name = formatTime)]
pub fn format_time_js(seconds: f64) -> String {
    format::format_time(seconds)
}

/// Seek bar fill percentage (0-100)
#[wasm_bindgen(js_name = progressPercent)]
pub fn progress_percent_js(value: f64, max: f64) -> f64 {
    format::progress_percent(value, max)
}

/// Help overlay rows as `[key, description]` pairs
#[wasm_bindgen(js_name = shortcutHelp)]
pub fn shortcut_help() -> JsValue {
    serde_wasm_bindgen::to_value(&KeyCommand::help_entries()).unwrap_or(JsValue::NULL)
}

fn media_event(name: &str, element: &HtmlAudioElement) -> Option<MediaEvent> {
    let event = match name {
        "ended" => MediaEvent::Ended,
        "error" => MediaEvent::Error {
            message: format!("Failed to load {}", element.src()),
        },
        "loadedmetadata" => MediaEvent::LoadedMetadata {
            duration_secs: element.duration(),
        },
        "timeupdate" => MediaEvent::TimeUpdate {
            current_secs: element.current_time(),
        },
        "waiting" => MediaEvent::Waiting,
        "canplay" => MediaEvent::CanPlay,
        "playing" => MediaEvent::Playing,
        _ => return None,
    };
    Some(event)
}

fn wire_media_events(
    element: &HtmlAudioElement,
    controller: &PlaybackController,
) -> Result<Vec<Closure<dyn FnMut(Event)>>, JsValue> {
    let mut closures = Vec::with_capacity(MEDIA_EVENTS.len());

    for name in MEDIA_EVENTS {
        let controller = controller.clone();
        let target = element.clone();
        let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let Some(event) = media_event(name, &target) else {
                return;
            };
            let controller = controller.clone();
            spawn_local(async move {
                if let Err(e) = controller.handle_media_event(event).await {
                    debug!("Media event '{}' handling failed: {}", name, e);
                }
            });
        });
        element.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        closures.push(closure);
    }

    Ok(closures)
}
