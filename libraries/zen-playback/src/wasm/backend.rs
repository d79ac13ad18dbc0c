//! Browser implementations of the collaborator traits

use crate::{AudioGraph, Clock, KeyValueStore, MediaElement, MediaError, Notifier, Severity, StoreError};
use async_trait::async_trait;
use js_sys::Function;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioContextState, GainNode, HtmlAudioElement, HtmlMediaElement,
    MediaElementAudioSourceNode, Storage,
};

/// Best-effort text for a rejected promise or thrown value
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

fn media_error(value: JsValue) -> MediaError {
    MediaError::new(js_error_message(&value))
}

/// `<audio>` element
pub struct WebMedia {
    element: HtmlAudioElement,
}

impl WebMedia {
    pub fn new(element: HtmlAudioElement) -> Self {
        Self { element }
    }
}

#[async_trait(?Send)]
impl MediaElement for WebMedia {
    fn set_source(&self, locator: &str) {
        self.element.set_src(locator);
    }

    fn source(&self) -> Option<String> {
        let src = self.element.src();
        (!src.is_empty()).then_some(src)
    }

    fn load(&self) {
        self.element.load();
    }

    async fn play(&self) -> Result<(), MediaError> {
        let promise = self.element.play().map_err(media_error)?;
        JsFuture::from(promise).await.map_err(media_error)?;
        Ok(())
    }

    fn pause(&self) {
        if let Err(e) = self.element.pause() {
            debug!("pause() threw: {}", js_error_message(&e));
        }
    }

    fn set_current_time(&self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> Option<f64> {
        // NaN until metadata, +Infinity for live streams
        let duration = self.element.duration();
        duration.is_finite().then_some(duration)
    }
}

/// `MediaElementAudioSourceNode → GainNode → destination`
pub struct WebGraph {
    context: AudioContext,
    gain: GainNode,
    _source: MediaElementAudioSourceNode,
}

impl WebGraph {
    /// Route `element` through a fresh gain node
    ///
    /// An element can be captured by one source node only, so build this once
    /// per element.
    pub fn new(element: &HtmlMediaElement) -> Result<Self, JsValue> {
        let context = AudioContext::new()?;
        let source = context.create_media_element_source(element)?;
        let gain = context.create_gain()?;
        source.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&context.destination())?;

        Ok(Self {
            context,
            gain,
            _source: source,
        })
    }

    fn log_param_error(result: Result<web_sys::AudioParam, JsValue>) {
        if let Err(e) = result {
            debug!("Gain automation rejected: {}", js_error_message(&e));
        }
    }
}

#[async_trait(?Send)]
impl AudioGraph for WebGraph {
    fn is_suspended(&self) -> bool {
        self.context.state() == AudioContextState::Suspended
    }

    async fn resume(&self) -> Result<(), MediaError> {
        let promise = self.context.resume().map_err(media_error)?;
        JsFuture::from(promise).await.map_err(media_error)?;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    fn gain(&self) -> f32 {
        self.gain.gain().value()
    }

    fn cancel_scheduled(&self, at: f64) {
        // cancelAndHoldAtTime is missing in Firefox: read, cancel, re-set
        let param = self.gain.gain();
        let held = param.value();
        Self::log_param_error(param.cancel_scheduled_values(at));
        Self::log_param_error(param.set_value_at_time(held, at));
    }

    fn set_gain_at(&self, value: f32, at: f64) {
        Self::log_param_error(self.gain.gain().set_value_at_time(value, at));
    }

    fn linear_ramp_to(&self, value: f32, end: f64) {
        Self::log_param_error(self.gain.gain().linear_ramp_to_value_at_time(value, end));
    }
}

/// `window.localStorage`
pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn new() -> Result<Self, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(js_error_message(&e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(key)
            .map_err(|e| StoreError::Unavailable(js_error_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StoreError::Unavailable(js_error_message(&e)))
    }
}

/// `setTimeout`-driven clock
pub struct TimeoutClock {
    origin_ms: f64,
}

impl TimeoutClock {
    pub fn new() -> Self {
        Self {
            origin_ms: js_sys::Date::now(),
        }
    }
}

impl Default for TimeoutClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Clock for TimeoutClock {
    fn now(&self) -> Duration {
        let elapsed_ms = (js_sys::Date::now() - self.origin_ms).max(0.0);
        Duration::from_secs_f64(elapsed_ms / 1000.0)
    }

    async fn sleep(&self, duration: Duration) {
        let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve: Function, _reject: Function| {
            let scheduled = web_sys::window().map(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            });
            if !matches!(scheduled, Some(Ok(_))) {
                // No timer available: resolve now rather than hang
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}

/// Forwards toasts to a JS callback `(message, severity)`, or the console
pub struct CallbackNotifier {
    callback: Rc<RefCell<Option<Function>>>,
}

impl CallbackNotifier {
    pub fn new(callback: Rc<RefCell<Option<Function>>>) -> Self {
        Self { callback }
    }
}

impl Notifier for CallbackNotifier {
    fn show(&self, message: &str, severity: Severity) {
        let callback = self.callback.borrow().clone();
        let text = JsValue::from_str(message);

        match callback {
            Some(cb) => {
                let level = match severity {
                    Severity::Info => "info",
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                };
                let _ = cb.call2(&JsValue::NULL, &text, &JsValue::from_str(level));
            }
            None => match severity {
                Severity::Info => web_sys::console::log_1(&text),
                Severity::Warning => web_sys::console::warn_1(&text),
                Severity::Error => web_sys::console::error_1(&text),
            },
        }
    }
}
