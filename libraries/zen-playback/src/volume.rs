//! Volume and mute state
//!
//! Linear gain in [0, 1]. The output stage is a gain node, so the level here is
//! the multiplier written to it (no perceptual curve).

use crate::error::{PlaybackError, Result};

/// Gain used when unmuting without a remembered level
pub const DEFAULT_UNMUTE_LEVEL: f32 = 0.5;

/// Clamp a gain value into [0, 1], mapping NaN to silence
pub fn clamp_gain(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// User volume with mute that remembers the level it replaced
#[derive(Debug, Clone)]
pub struct VolumeState {
    /// User's chosen level (0.0-1.0), persisted
    user_volume: f32,

    /// Mute state (preserves user volume)
    muted: bool,

    /// Gain that was audible when mute was engaged
    pre_mute: Option<f32>,

    /// Level restored when nothing was remembered
    unmute_fallback: f32,
}

impl VolumeState {
    /// Create volume state at `level` (clamped)
    pub fn new(level: f32) -> Self {
        Self {
            user_volume: clamp_gain(level),
            muted: false,
            pre_mute: None,
            unmute_fallback: DEFAULT_UNMUTE_LEVEL,
        }
    }

    pub fn with_unmute_fallback(mut self, level: f32) -> Self {
        self.unmute_fallback = clamp_gain(level);
        self
    }

    /// Set user volume
    ///
    /// Fails with `InvalidInput` (and changes nothing) unless `level` is
    /// within [0, 1]. While muted, the new level is also what unmute restores.
    pub fn set_user_volume(&mut self, level: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(PlaybackError::InvalidInput(format!(
                "volume {level} outside 0.0-1.0"
            )));
        }
        self.user_volume = level;
        if self.muted {
            self.pre_mute = Some(level);
        }
        Ok(())
    }

    /// User's chosen level
    pub fn user_volume(&self) -> f32 {
        self.user_volume
    }

    /// Engage mute, remembering the gain that was audible
    pub fn mute(&mut self, current_gain: f32) {
        self.pre_mute = Some(clamp_gain(current_gain));
        self.muted = true;
    }

    /// Release mute
    ///
    /// Returns the gain to restore.
    pub fn unmute(&mut self) -> f32 {
        self.muted = false;
        self.pre_mute.take().unwrap_or(self.unmute_fallback)
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain the output stage should settle on outside of fades
    ///
    /// Returns 0.0 if muted, otherwise the user volume.
    pub fn effective_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.user_volume
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(DEFAULT_UNMUTE_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn create_volume() {
        let vol = VolumeState::new(0.8);
        assert_eq!(vol.user_volume(), 0.8);
        assert!(!vol.is_muted());
        assert_eq!(vol.effective_gain(), 0.8);
    }

    #[test]
    fn new_clamps_initial_level() {
        assert_eq!(VolumeState::new(1.5).user_volume(), 1.0);
        assert_eq!(VolumeState::new(-0.2).user_volume(), 0.0);
        assert_eq!(VolumeState::new(f32::NAN).user_volume(), 0.0);
    }

    #[test]
    fn out_of_range_levels_are_ignored() {
        let mut vol = VolumeState::new(0.4);
        assert!(matches!(
            vol.set_user_volume(1.01),
            Err(PlaybackError::InvalidInput(_))
        ));
        assert!(vol.set_user_volume(-0.5).is_err());
        assert!(vol.set_user_volume(f32::NAN).is_err());
        assert_eq!(vol.user_volume(), 0.4);

        assert!(vol.set_user_volume(0.0).is_ok());
        assert_eq!(vol.user_volume(), 0.0);
        assert!(vol.set_user_volume(1.0).is_ok());
        assert_eq!(vol.user_volume(), 1.0);
    }

    #[test]
    fn mute_restores_the_gain_that_was_audible() {
        let mut vol = VolumeState::new(0.8);
        vol.mute(0.6);
        assert!(vol.is_muted());
        assert_eq!(vol.effective_gain(), 0.0);
        assert_eq!(vol.user_volume(), 0.8); // Level preserved

        assert_eq!(vol.unmute(), 0.6);
        assert!(!vol.is_muted());
        // Memory is consumed: a second unmute falls back
        assert_eq!(vol.unmute(), DEFAULT_UNMUTE_LEVEL);
    }

    #[test]
    fn volume_change_while_muted_is_restored_on_unmute() {
        let mut vol = VolumeState::new(0.8);
        vol.mute(0.8);
        assert!(vol.set_user_volume(0.3).is_ok());
        assert_eq!(vol.effective_gain(), 0.0);
        assert_eq!(vol.unmute(), 0.3);
    }

    #[test]
    fn unmute_without_memory_uses_fallback() {
        let mut vol = VolumeState::new(0.8);
        assert_eq!(vol.unmute(), DEFAULT_UNMUTE_LEVEL);

        let mut vol = VolumeState::new(0.8).with_unmute_fallback(0.25);
        assert_eq!(vol.unmute(), 0.25);
    }

    proptest! {
        #[test]
        fn set_user_volume_accepts_exactly_the_unit_interval(start in 0.0f32..=1.0, level in -2.0f32..3.0) {
            let mut vol = VolumeState::new(start);
            let accepted = vol.set_user_volume(level).is_ok();

            if (0.0..=1.0).contains(&level) {
                prop_assert!(accepted);
                prop_assert_eq!(vol.user_volume(), level);
            } else {
                prop_assert!(!accepted);
                prop_assert_eq!(vol.user_volume(), start);
            }
        }

        #[test]
        fn clamp_gain_stays_in_unit_interval(value in proptest::num::f32::ANY) {
            let g = clamp_gain(value);
            prop_assert!((0.0..=1.0).contains(&g));
        }
    }
}
