//! Persisted user preferences
//!
//! Volume and the current track index survive reloads as one JSON object under
//! a single key:
//!
//! ```json
//! {"volume": 0.35, "trackIndex": 2}
//! ```
//!
//! Reading never fails. Missing keys, malformed JSON and out-of-range values
//! are discarded field by field; store failures are logged and treated as
//! "nothing stored". Writes are best effort.

use crate::error::StoreError;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// Default key for the preferences blob
pub const STORAGE_KEY: &str = "audioPlayerState";

/// Durable string key-value store (browser `localStorage` shaped)
pub trait KeyValueStore {
    /// Value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store
///
/// Writes can be made to fail, to exercise the log-only failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Make every subsequent `set` fail (quota exceeded, private mode)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Raw stored value, bypassing the trait
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file
///
/// The whole file is rewritten on every `set`. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

/// Fields recovered from the store; each is `None` when absent or invalid
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoredPreferences {
    pub volume: Option<f32>,
    pub track_index: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesRecord {
    volume: f32,
    track_index: usize,
}

/// Reads and writes the preferences blob
pub struct PersistedPreferences {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl PersistedPreferences {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Read stored preferences for a playlist of `track_count` tracks
    ///
    /// Volume must be a number in [0, 1]; trackIndex an integer below
    /// `track_count`. Anything else is dropped silently.
    pub fn load(&self, track_count: usize) -> StoredPreferences {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StoredPreferences::default(),
            Err(e) => {
                warn!("Failed to read preferences: {}", e);
                return StoredPreferences::default();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => parse_preferences(&value, track_count),
            Err(e) => {
                debug!("Ignoring malformed preferences: {}", e);
                StoredPreferences::default()
            }
        }
    }

    /// Write the current volume and track index
    ///
    /// Failures are logged, never raised.
    pub fn save(&self, volume: f32, track_index: usize) {
        if let Err(e) = self.try_save(volume, track_index) {
            warn!("Failed to save preferences: {}", e);
        }
    }

    fn try_save(&self, volume: f32, track_index: usize) -> Result<(), StoreError> {
        let record = PreferencesRecord {
            volume,
            track_index,
        };
        let json = serde_json::to_string(&record)?;
        self.store.set(&self.key, &json)
    }
}

/// Non-negative integer, whether written as `1` or `1.0`
fn stored_index(value: &serde_json::Value) -> Option<usize> {
    if let Some(i) = value.as_u64() {
        return usize::try_from(i).ok();
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

fn parse_preferences(value: &serde_json::Value, track_count: usize) -> StoredPreferences {
    let volume = value
        .get("volume")
        .and_then(serde_json::Value::as_f64)
        .filter(|v| (0.0..=1.0).contains(v))
        .map(|v| v as f32);

    let track_index = value
        .get("trackIndex")
        .and_then(stored_index)
        .filter(|i| *i < track_count);

    StoredPreferences {
        volume,
        track_index,
    }
}
