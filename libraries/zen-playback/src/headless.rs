//! In-process media and graph backends
//!
//! No audio leaves the process. `HeadlessMedia` plays out scripted outcomes
//! and records what it was asked to do; `HeadlessGraph` evaluates gain
//! automation against a [`Clock`] so fades can be sampled at any instant.
//! Used by native hosts without an audio device and throughout the tests.

use crate::clock::Clock;
use crate::error::MediaError;
use crate::media::{AudioGraph, MediaElement};
use crate::volume::clamp_gain;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Ramp end tolerance for float drift between clock and schedule
const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Default)]
struct MediaInner {
    source: Option<String>,
    paused: bool,
    current_time: f64,
    duration: Option<f64>,
    outcomes: VecDeque<Result<(), MediaError>>,
    play_latency: Duration,
    play_calls: u32,
    pause_calls: u32,
    load_calls: u32,
    seeks: Vec<f64>,
}

/// Scriptable media element
///
/// `play` consumes queued outcomes in order and succeeds once the queue is
/// empty.
pub struct HeadlessMedia {
    clock: Rc<dyn Clock>,
    inner: RefCell<MediaInner>,
}

impl HeadlessMedia {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RefCell::new(MediaInner {
                paused: true,
                ..MediaInner::default()
            }),
        }
    }

    /// Queue the result of a future `play` call
    pub fn push_play_outcome(&self, outcome: Result<(), MediaError>) {
        self.inner.borrow_mut().outcomes.push_back(outcome);
    }

    /// Queue `count` rejections
    pub fn fail_next_plays(&self, count: usize, reason: &str) {
        for _ in 0..count {
            self.push_play_outcome(Err(MediaError::new(reason)));
        }
    }

    /// Time `play` takes to settle
    pub fn set_play_latency(&self, latency: Duration) {
        self.inner.borrow_mut().play_latency = latency;
    }

    /// Report metadata for the current source
    pub fn set_duration(&self, duration: Option<f64>) {
        self.inner.borrow_mut().duration = duration;
    }

    /// Move the playhead as if media had been playing
    pub fn advance_to(&self, seconds: f64) {
        self.inner.borrow_mut().current_time = seconds;
    }

    pub fn is_paused(&self) -> bool {
        self.inner.borrow().paused
    }

    pub fn play_calls(&self) -> u32 {
        self.inner.borrow().play_calls
    }

    pub fn pause_calls(&self) -> u32 {
        self.inner.borrow().pause_calls
    }

    pub fn load_calls(&self) -> u32 {
        self.inner.borrow().load_calls
    }

    /// Every position written through `set_current_time`
    pub fn seeks(&self) -> Vec<f64> {
        self.inner.borrow().seeks.clone()
    }
}

#[async_trait(?Send)]
impl MediaElement for HeadlessMedia {
    fn set_source(&self, locator: &str) {
        self.inner.borrow_mut().source = Some(locator.to_string());
    }

    fn source(&self) -> Option<String> {
        self.inner.borrow().source.clone()
    }

    fn load(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.load_calls += 1;
        inner.current_time = 0.0;
        inner.duration = None;
        // Loading a resource pauses the element
        inner.paused = true;
    }

    async fn play(&self) -> Result<(), MediaError> {
        let latency = {
            let mut inner = self.inner.borrow_mut();
            inner.play_calls += 1;
            inner.play_latency
        };

        if !latency.is_zero() {
            self.clock.sleep(latency).await;
        }

        let mut inner = self.inner.borrow_mut();
        let outcome = inner.outcomes.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            inner.paused = false;
        }
        outcome
    }

    fn pause(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.pause_calls += 1;
        inner.paused = true;
    }

    fn set_current_time(&self, seconds: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.current_time = seconds;
        inner.seeks.push(seconds);
    }

    fn current_time(&self) -> f64 {
        self.inner.borrow().current_time
    }

    fn duration(&self) -> Option<f64> {
        self.inner.borrow().duration
    }
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    from_value: f32,
    from_time: f64,
    to_value: f32,
    end_time: f64,
}

impl Ramp {
    fn value_at(&self, t: f64) -> f32 {
        if t >= self.end_time - TIME_EPSILON {
            self.to_value
        } else if t <= self.from_time {
            self.from_value
        } else {
            let span = self.end_time - self.from_time;
            let progress = ((t - self.from_time) / span) as f32;
            self.from_value + (self.to_value - self.from_value) * progress
        }
    }
}

#[derive(Debug)]
struct GraphInner {
    suspended: bool,
    resume_failure: Option<String>,
    resume_calls: u32,

    /// Last value set and when
    anchor_value: f32,
    anchor_time: f64,

    ramp: Option<Ramp>,
}

impl GraphInner {
    fn value_at(&self, t: f64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(t),
            None => self.anchor_value,
        }
    }
}

/// Gain automation evaluated on a [`Clock`]
///
/// Starts running at unity gain, like a fresh Web Audio gain node.
pub struct HeadlessGraph {
    clock: Rc<dyn Clock>,
    inner: RefCell<GraphInner>,
}

impl HeadlessGraph {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RefCell::new(GraphInner {
                suspended: false,
                resume_failure: None,
                resume_calls: 0,
                anchor_value: 1.0,
                anchor_time: 0.0,
                ramp: None,
            }),
        }
    }

    /// Start suspended, as a browser does before a user gesture
    pub fn suspended(self) -> Self {
        self.inner.borrow_mut().suspended = true;
        self
    }

    /// Make every `resume` fail with `reason`
    pub fn fail_resume(&self, reason: &str) {
        self.inner.borrow_mut().resume_failure = Some(reason.to_string());
    }

    pub fn resume_calls(&self) -> u32 {
        self.inner.borrow().resume_calls
    }

    /// Gain at an arbitrary graph time under the current schedule
    pub fn gain_at(&self, t: f64) -> f32 {
        self.inner.borrow().value_at(t)
    }
}

#[async_trait(?Send)]
impl AudioGraph for HeadlessGraph {
    fn is_suspended(&self) -> bool {
        self.inner.borrow().suspended
    }

    async fn resume(&self) -> Result<(), MediaError> {
        let mut inner = self.inner.borrow_mut();
        inner.resume_calls += 1;
        if let Some(reason) = &inner.resume_failure {
            return Err(MediaError::new(reason.clone()));
        }
        inner.suspended = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }

    fn gain(&self) -> f32 {
        self.gain_at(self.current_time())
    }

    fn cancel_scheduled(&self, at: f64) {
        let mut inner = self.inner.borrow_mut();
        let held = inner.value_at(at);
        inner.ramp = None;
        inner.anchor_value = held;
        inner.anchor_time = at;
    }

    fn set_gain_at(&self, value: f32, at: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.ramp = None;
        inner.anchor_value = clamp_gain(value);
        inner.anchor_time = at;
    }

    fn linear_ramp_to(&self, value: f32, end: f64) {
        let mut inner = self.inner.borrow_mut();
        // A ramp starts from the previous event: the last ramp's end or the anchor
        let (from_value, from_time) = match inner.ramp {
            Some(ramp) => (ramp.to_value, ramp.end_time),
            None => (inner.anchor_value, inner.anchor_time),
        };
        inner.ramp = Some(Ramp {
            from_value,
            from_time,
            to_value: clamp_gain(value),
            end_time: end,
        });
    }
}
