//! Keyboard shortcuts
//!
//! Maps DOM keyboard events to player commands. Shortcuts are app-level: they
//! never fire while the user is typing in a text field.

use serde::{Deserialize, Serialize};

/// Command triggered by a shortcut
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    /// Play or pause playback
    TogglePlayPause,
    /// Skip to next track
    NextTrack,
    /// Skip to previous track
    PreviousTrack,
    /// Show or hide the shortcut help overlay
    ToggleHelp,
    /// Hide the shortcut help overlay
    CloseHelp,
}

impl KeyCommand {
    /// Resolve a keyboard event
    ///
    /// `code` is the physical key (`KeyboardEvent.code`), `key` the produced
    /// character (`KeyboardEvent.key`). Returns `None` for unbound keys and
    /// whenever the event target is a text input or textarea.
    pub fn from_key(code: &str, key: &str, target_is_text_input: bool) -> Option<Self> {
        if target_is_text_input {
            return None;
        }
        match (code, key) {
            ("Space", _) => Some(Self::TogglePlayPause),
            ("ArrowRight", _) => Some(Self::NextTrack),
            ("ArrowLeft", _) => Some(Self::PreviousTrack),
            ("Escape", _) => Some(Self::CloseHelp),
            (_, "?") => Some(Self::ToggleHelp),
            _ => None,
        }
    }

    /// Whether the command only affects UI chrome, not playback
    pub fn is_ui_only(self) -> bool {
        matches!(self, Self::ToggleHelp | Self::CloseHelp)
    }

    /// Convert command to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TogglePlayPause => "toggle_play_pause",
            Self::NextTrack => "next_track",
            Self::PreviousTrack => "previous_track",
            Self::ToggleHelp => "toggle_help",
            Self::CloseHelp => "close_help",
        }
    }

    /// Key label and description, for the help overlay
    pub fn help_entries() -> [(&'static str, &'static str); 5] {
        [
            ("Space", "Play / Pause"),
            ("→", "Next track"),
            ("←", "Previous track"),
            ("?", "Show shortcuts"),
            ("Esc", "Close help"),
        ]
    }
}
