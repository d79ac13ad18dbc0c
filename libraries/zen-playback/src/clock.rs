//! Timer abstraction
//!
//! Retry backoff and fades wait on a [`Clock`] instead of a concrete runtime so
//! the same code runs under tokio, in the browser, and under a paused test clock.

use async_trait::async_trait;
use std::time::Duration;

/// Monotonic time source with an async sleep
#[async_trait(?Send)]
pub trait Clock {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Resolve after `duration` has elapsed
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by `tokio::time`
///
/// Honors `tokio::time::pause`, so tests can drive it deterministically.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

#[cfg(feature = "tokio")]
impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "tokio")]
impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tokio")]
#[async_trait(?Send)]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
