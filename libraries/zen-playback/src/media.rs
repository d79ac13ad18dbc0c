//! Platform-agnostic media primitives
//!
//! The controller never touches a browser API directly. A host supplies one
//! [`MediaElement`] (the streaming audio resource) and one [`AudioGraph`]
//! (the gain stage it is routed through). Both take `&self`: like DOM handles,
//! implementations use interior mutability.

use crate::error::MediaError;
use async_trait::async_trait;

/// A single streaming media resource (an `<audio>` element in the browser)
#[async_trait(?Send)]
pub trait MediaElement {
    /// Point the element at a new source locator
    fn set_source(&self, locator: &str);

    /// Currently assigned source, if any
    fn source(&self) -> Option<String>;

    /// Reload media metadata for the current source
    ///
    /// Resets the playback position to zero. Metadata or an error are reported
    /// later through [`crate::MediaEvent`]s, never from this call.
    fn load(&self);

    /// Start playback
    ///
    /// May reject: autoplay restrictions, buffering, network or decode
    /// failures.
    async fn play(&self) -> Result<(), MediaError>;

    /// Stop playback immediately; idempotent
    fn pause(&self);

    /// Move the playback position
    fn set_current_time(&self, seconds: f64);

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Duration of the loaded media, `None` until metadata arrives
    fn duration(&self) -> Option<f64>;
}

/// Gain stage plus the audio processing graph that owns it
///
/// Times are in the graph's own clock (seconds), as in Web Audio.
#[async_trait(?Send)]
pub trait AudioGraph {
    /// Whether the graph is suspended (browser autoplay policy)
    fn is_suspended(&self) -> bool;

    /// Resume a suspended graph
    async fn resume(&self) -> Result<(), MediaError>;

    /// Graph clock in seconds
    fn current_time(&self) -> f64;

    /// Gain value right now
    fn gain(&self) -> f32;

    /// Drop every scheduled change from `at` onward, holding the value
    /// reached at that moment
    fn cancel_scheduled(&self, at: f64);

    /// Jump to `value` at time `at`
    fn set_gain_at(&self, value: f32, at: f64);

    /// Ramp linearly from the previous scheduled value to `value`, arriving
    /// at `end`
    fn linear_ramp_to(&self, value: f32, end: f64);

    /// Replace any schedule with `value`, effective now
    fn set_gain_now(&self, value: f32) {
        let now = self.current_time();
        self.cancel_scheduled(now);
        self.set_gain_at(value, now);
    }
}
