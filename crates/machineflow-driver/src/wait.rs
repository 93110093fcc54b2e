//! Fixed-interval condition polling

use crate::error::DriverError;
use std::future::Future;
use std::time::Duration;

/// Polling configuration for long-running remote operations
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Maximum number of checks before giving up
    pub max_attempts: u32,

    /// Delay between two checks
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound of the time spent waiting
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            interval: Duration::from_secs(4),
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Condition met, stop polling
    Ready(T),
    /// Keep waiting
    Pending,
}

/// Run `check` until it is ready, fails, or the attempt budget is exhausted
///
/// An error returned by `check` stops polling immediately. Exhausting the
/// budget yields [`DriverError::Timeout`].
pub async fn wait_for<T, E, F, Fut>(policy: &PollPolicy, mut check: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Check<T>, E>>,
    E: From<DriverError>,
{
    for attempt in 1..=policy.max_attempts {
        match check().await? {
            Check::Ready(value) => return Ok(value),
            Check::Pending => {
                tracing::debug!(attempt, max_attempts = policy.max_attempts, "Still waiting");
                if attempt < policy.max_attempts && !policy.interval.is_zero() {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    Err(DriverError::Timeout(format!(
        "condition not met after {} attempts ({}s)",
        policy.max_attempts,
        policy.budget().as_secs()
    ))
    .into())
}
