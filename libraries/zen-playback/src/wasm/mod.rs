//! WASM bindings for zen-playback
//!
//! Browser implementations of the media, graph, store and clock traits, and a
//! `WasmAudioPlayer` that wires them to an `<audio>` element for JavaScript.

mod backend;
mod player;

pub use backend::{CallbackNotifier, LocalStorageStore, TimeoutClock, WebGraph, WebMedia};
pub use player::{format_time_js, progress_percent_js, shortcut_help, WasmAudioPlayer};
