//! Retryable async operations with backoff
//!
//! `attempt` runs an operation until it succeeds, the attempt budget runs out,
//! or the caller reports that the work is no longer wanted. Delays come from an
//! injected [`Clock`], never from a runtime directly.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// `step × n` after the n-th failure (500, 1000, 1500, ...)
    Linear { step: Duration },

    /// The same delay after every failure
    Constant { delay: Duration },
}

impl Backoff {
    /// Delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Constant { delay } => delay,
        }
    }
}

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1 is always made)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Linear backoff with the given step
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::new(max_attempts, Backoff::Linear { step })
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 500 ms then 1000 ms between them
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(500))
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The caller withdrew interest between attempts
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Run `operation` under `policy`
///
/// `operation` receives the 1-based attempt number. `is_cancelled` is checked
/// before every attempt, including the first; once it returns true no further
/// attempt is made.
pub async fn attempt<T, E, F, Fut, C>(
    clock: &C,
    policy: &RetryPolicy,
    is_cancelled: impl Fn() -> bool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt_no = 1;

    loop {
        if is_cancelled() {
            return Err(RetryError::Cancelled {
                attempts: attempt_no - 1,
            });
        }

        match operation(attempt_no).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt_no >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt_no,
                    last: err,
                });
            }
            Err(err) => {
                let delay = policy.backoff.delay_after(attempt_no);
                debug!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt_no, max_attempts, err, delay
                );
                clock.sleep(delay).await;
                attempt_no += 1;
            }
        }
    }
}
