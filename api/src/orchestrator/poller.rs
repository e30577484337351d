use std::{fmt::Display, future::Future, time::Duration};

use certmesh_common::views::Readiness;
use tracing::{debug, warn};

/// Bounded wait for a phase to report `Ready`.
///
/// Attempt `k` (0-based) sleeps `base_delay + k * step_delay` and then checks.
/// With the defaults that is 2s, 3s, 4s and 5s across four attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoller {
    attempts: u32,
    base_delay: Duration,
    step_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The phase reported `Ready` on the given (1-based) attempt.
    Ready { attempts: u32 },

    /// Every attempt was used up without seeing `Ready`.
    Exhausted { attempts: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(2), Duration::from_secs(1))
    }
}

impl ReadinessPoller {
    pub fn new(attempts: u32, base_delay: Duration, step_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
            step_delay,
        }
    }

    /// Same number of checks, no sleeping in between.
    pub fn without_delay(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay + self.step_delay * attempt
    }

    /// Run `check` until it reports [`Readiness::Ready`] or the attempts run
    /// out. A failing check counts as a not-ready attempt.
    pub async fn wait_until_ready<F, Fut, E>(&self, mut check: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Readiness, E>>,
        E: Display,
    {
        for attempt in 0..self.attempts {
            tokio::time::sleep(self.delay_before(attempt)).await;

            match check().await {
                Ok(readiness) if readiness.is_ready() => {
                    debug!(attempt = attempt + 1, "Phase is ready");
                    return PollOutcome::Ready {
                        attempts: attempt + 1,
                    };
                }
                Ok(readiness) => {
                    debug!(attempt = attempt + 1, %readiness, "Phase not ready yet");
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "Readiness check failed");
                }
            }
        }

        PollOutcome::Exhausted {
            attempts: self.attempts,
        }
    }
}
