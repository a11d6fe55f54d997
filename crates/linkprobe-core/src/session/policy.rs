use std::time::Duration;

/// Reconnect parameters. Fixed at startup, never negotiated.
///
/// Failed connection attempts retry after `base_delay` until `retry_budget`
/// attempts have failed; from then on every further failure doubles the
/// delay, without a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before reconnecting while the budget lasts.
    pub base_delay: Duration,
    /// Failed attempts tolerated at `base_delay`.
    pub retry_budget: i64,
    /// Liveness check period while connected.
    pub watchdog_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            retry_budget: 3_000_000,
            watchdog_interval: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff after a failed attempt, given the budget left after charging it.
    pub fn grow(&self, current: Duration, budget_left: i64) -> Duration {
        if budget_left < 0 {
            current.saturating_mul(2)
        } else {
            current
        }
    }
}
