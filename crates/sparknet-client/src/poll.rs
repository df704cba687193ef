//! Cancellable timed retry.
//!
//! [`poll_until`] runs a check at a fixed interval until it breaks, the
//! deadline passes, or the caller cancels. The deadline is wall-clock based
//! and holds even when a single check never resolves.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

/// Interval and deadline for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between checks.
    pub interval: Duration,
    /// Total time allowed.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Why polling stopped without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollError {
    /// The deadline passed first.
    #[error("no result after {elapsed:?}")]
    TimedOut {
        /// Time spent polling.
        elapsed: Duration,
    },
    /// The caller cancelled.
    #[error("polling cancelled")]
    Cancelled,
}

/// Run `check` every `config.interval` until it returns `Break`.
///
/// # Errors
///
/// Returns [`PollError::TimedOut`] no earlier than `config.timeout` after the
/// call, or [`PollError::Cancelled`] once `cancel` fires.
pub async fn poll_until<T, F, Fut>(
    mut check: F,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<T>>,
{
    let start = Instant::now();
    let deadline = start + config.timeout;

    loop {
        let flow = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled),
            () = sleep_until(deadline) => {
                return Err(PollError::TimedOut { elapsed: start.elapsed() });
            }
            flow = check() => flow,
        };
        if let ControlFlow::Break(value) = flow {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                elapsed: now - start,
            });
        }
        let wait = config.interval.min(deadline - now);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled),
            () = sleep(wait) => {}
        }
    }
}
