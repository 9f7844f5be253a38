//! Bounded polling
//!
//! Replaces fixed sleeps with "wait until the remote state satisfies a
//! predicate, bounded by a timeout". Predicate errors count as "not yet";
//! the last one is reported if the deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::common::{Config, Error, Result, SessionOptions};

/// Smallest interval between evaluations
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of a wait condition. Always bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Default wait from the `[timeouts]` section
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.timeouts.wait_secs),
            Duration::from_millis(config.timeouts.poll_interval_ms),
        )
    }

    /// Default wait carried by session options
    pub fn from_options(options: &SessionOptions) -> Self {
        Self::new(options.wait_timeout, options.poll_interval)
    }

    /// Same interval, different bound
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self::new(timeout, self.interval)
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Evaluate `predicate` until it returns `Ok(true)` or the wait expires
pub async fn poll<F, Fut>(mut predicate: F, wait: Wait) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_for(
        || {
            let check = predicate();
            async move { check.await.map(|ok| ok.then_some(())) }
        },
        wait,
    )
    .await
}

/// Evaluate `probe` until it yields a value or the wait expires
///
/// Each evaluation is itself bounded by the time remaining, so a hung
/// remote call cannot stretch the wait past `timeout + interval`.
pub async fn poll_for<T, F, Fut>(mut probe: F, wait: Wait) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + wait.timeout;
    let mut last_error: Option<String> = None;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining.max(MIN_INTERVAL), probe()).await {
            Ok(Ok(Some(value))) => {
                tracing::debug!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "Condition met");
                return Ok(value);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::debug!(attempts, error = %e, "Predicate not yet satisfied");
                last_error = Some(e.to_string());
            }
            Err(_) => {
                last_error = Some("evaluation did not complete before the deadline".to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            let waited_ms = now.duration_since(start).as_millis() as u64;
            tracing::debug!(attempts, waited_ms, "Wait expired");
            return Err(Error::timeout(waited_ms, last_error));
        }

        tokio::time::sleep(wait.interval.min(deadline - now)).await;
    }
}
