//! Gain fades for track transitions
//!
//! One fade at a time. A fade requested while another is running is dropped,
//! not queued: overlapping ramps on the same gain parameter fight each other
//! and callers awaiting a queued fade would stall behind it.
//!
//! Two ways to drive the ramp:
//! - Native: schedule a linear ramp on the gain parameter and wait out its
//!   nominal duration (Web Audio `linearRampToValueAtTime`)
//! - Stepped: write interpolated values on a timer, for gain stages without
//!   automation support

use crate::clock::Clock;
use crate::media::AudioGraph;
use crate::volume::clamp_gain;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// How the ramp is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeStrategy {
    /// Schedule the ramp on the gain parameter itself
    #[default]
    Native,

    /// Write a new gain value every `step_ms`
    Stepped { step_ms: u64 },
}

/// How a fade request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// Ramp ran for its full duration
    Completed,

    /// Another fade was in flight; nothing was scheduled
    Skipped,

    /// `cancel` was called while the ramp was running
    Cancelled,
}

/// Linear interpolation between two gains
///
/// `progress` is clamped to [0, 1]; the result is clamped to [0, 1].
#[inline]
pub fn ramp_value(start: f32, target: f32, progress: f32) -> f32 {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    clamp_gain(start + (target - start) * progress)
}

/// Longest stretch a native fade waits before re-checking for cancellation
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Clears the busy flag however the fade future ends (completion or drop)
///
/// A cancelled fade has already released the flag, possibly to a newer fade,
/// so the guard only clears it while its own epoch is current.
struct BusyGuard<'a> {
    busy: &'a Cell<bool>,
    epoch: &'a Cell<u64>,
    engaged_at: u64,
}

impl<'a> BusyGuard<'a> {
    fn engage(busy: &'a Cell<bool>, epoch: &'a Cell<u64>) -> Self {
        busy.set(true);
        Self {
            busy,
            epoch,
            engaged_at: epoch.get(),
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.epoch.get() == self.engaged_at {
            self.busy.set(false);
        }
    }
}

/// Drives the output gain between levels over time
pub struct FadeController {
    graph: Rc<dyn AudioGraph>,
    clock: Rc<dyn Clock>,
    strategy: FadeStrategy,

    /// Set while a fade is running
    busy: Cell<bool>,

    /// Bumped by `cancel`; a running fade compares against its start value
    epoch: Cell<u64>,
}

impl FadeController {
    pub fn new(graph: Rc<dyn AudioGraph>, clock: Rc<dyn Clock>, strategy: FadeStrategy) -> Self {
        Self {
            graph,
            clock,
            strategy,
            busy: Cell::new(false),
            epoch: Cell::new(0),
        }
    }

    /// Check if a fade is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Ramp from the current gain to `target`
    pub async fn fade_to(&self, target: f32, duration: Duration) -> FadeOutcome {
        let start = self.graph.gain();
        self.fade_between(start, target, duration).await
    }

    /// Jump to `start`, then ramp to `target`
    pub async fn fade_between(&self, start: f32, target: f32, duration: Duration) -> FadeOutcome {
        if self.busy.get() {
            debug!("Fade to {:.2} dropped: another fade is running", target);
            return FadeOutcome::Skipped;
        }
        let _busy = BusyGuard::engage(&self.busy, &self.epoch);
        let epoch = self.epoch.get();

        let start = clamp_gain(start);
        let target = clamp_gain(target);

        if duration.is_zero() {
            self.graph.set_gain_now(target);
            return FadeOutcome::Completed;
        }

        match self.strategy {
            FadeStrategy::Native => self.run_native(start, target, duration, epoch).await,
            FadeStrategy::Stepped { step_ms } => {
                self.run_stepped(start, target, duration, Duration::from_millis(step_ms), epoch)
                    .await
            }
        }
    }

    /// Abandon the running fade's remaining schedule
    ///
    /// The gain holds whatever value it had reached and the controller is
    /// free for a new fade straight away.
    pub fn cancel(&self) {
        self.epoch.set(self.epoch.get().wrapping_add(1));
        self.busy.set(false);
        self.graph.cancel_scheduled(self.graph.current_time());
    }

    async fn run_native(
        &self,
        start: f32,
        target: f32,
        duration: Duration,
        epoch: u64,
    ) -> FadeOutcome {
        let now = self.graph.current_time();
        self.graph.cancel_scheduled(now);
        self.graph.set_gain_at(start, now);
        self.graph
            .linear_ramp_to(target, now + duration.as_secs_f64());

        let mut remaining = duration;
        while !remaining.is_zero() {
            let wait = remaining.min(CANCEL_POLL);
            self.clock.sleep(wait).await;
            remaining -= wait;
            if self.epoch.get() != epoch {
                return FadeOutcome::Cancelled;
            }
        }

        FadeOutcome::Completed
    }

    async fn run_stepped(
        &self,
        start: f32,
        target: f32,
        duration: Duration,
        step: Duration,
        epoch: u64,
    ) -> FadeOutcome {
        let step_ms = step.as_millis().max(1);
        let steps = duration.as_millis().div_ceil(step_ms).max(1) as u32;
        let step = duration / steps;

        self.graph.set_gain_now(start);

        for i in 1..=steps {
            self.clock.sleep(step).await;
            if self.epoch.get() != epoch {
                return FadeOutcome::Cancelled;
            }
            let value = ramp_value(start, target, i as f32 / steps as f32);
            self.graph.set_gain_now(value);
        }

        FadeOutcome::Completed
    }
}
