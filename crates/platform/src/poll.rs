//! Polling for eventually-consistent conditions.
//!
//! Route propagation and policy enforcement lag behind the API calls that trigger
//! them, so HTTP expectations are retried with [`eventually`] until they hold or a
//! deadline passes.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Deadline and retry interval for [`eventually`].
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

/// The value that satisfied the predicate.
#[derive(Debug, Clone)]
pub struct PollOutcome<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// The predicate never held before the deadline.
#[derive(Debug, Clone)]
pub struct PollTimeout<T> {
    pub attempts: u32,
    pub elapsed: Duration,
    /// Value from the final attempt
    pub last: T,
}

/// Calls `fetch` until `predicate` holds on its result.
///
/// At least one attempt is made, even with a zero timeout. A final attempt is made
/// right at the deadline.
pub async fn eventually<T, F, Fut, P>(
    settings: PollSettings,
    mut fetch: F,
    predicate: P,
) -> Result<PollOutcome<T>, PollTimeout<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        let value = fetch().await;
        let elapsed = started.elapsed();

        if predicate(&value) {
            debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, "condition met");
            return Ok(PollOutcome {
                value,
                attempts,
                elapsed,
            });
        }

        if elapsed >= settings.timeout {
            return Err(PollTimeout {
                attempts,
                elapsed,
                last: value,
            });
        }

        debug!(attempts, "condition not met, retrying");
        let remaining = settings.timeout - elapsed;
        tokio::time::sleep(settings.interval.min(remaining)).await;
    }
}

/// Substring condition on a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyExpectation {
    Contains(String),
    NotContains(String),
}

impl BodyExpectation {
    pub fn is_met(&self, body: &str) -> bool {
        match self {
            Self::Contains(needle) => body.contains(needle.as_str()),
            Self::NotContains(needle) => !body.contains(needle.as_str()),
        }
    }
}

impl fmt::Display for BodyExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(needle) => write!(f, "body contains '{needle}'"),
            Self::NotContains(needle) => write!(f, "body does not contain '{needle}'"),
        }
    }
}
