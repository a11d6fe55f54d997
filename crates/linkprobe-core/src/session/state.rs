use std::time::Duration;

use tracing::debug;

use super::policy::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One logical session to the controller, across any number of transports.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    policy: ReconnectPolicy,
    state: SessionState,
    retry_budget: i64,
    current_backoff: Duration,
    watchdog_armed: bool,
}

impl ConnectionSession {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: SessionState::Disconnected,
            retry_budget: policy.retry_budget,
            current_backoff: policy.base_delay,
            watchdog_armed: false,
        }
    }

    /// DISCONNECTED -> CONNECTING. False if an attempt is already underway
    /// or the session is connected.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != SessionState::Disconnected {
            return false;
        }
        self.state = SessionState::Connecting;
        true
    }

    /// CONNECTING -> CONNECTED. Arms the watchdog and restores the retry
    /// budget; returns the watchdog period, or `None` if no attempt was
    /// pending.
    pub fn on_open(&mut self) -> Option<Duration> {
        if self.state != SessionState::Connecting {
            return None;
        }
        self.state = SessionState::Connected;
        self.watchdog_armed = true;
        self.retry_budget = self.policy.retry_budget;
        self.current_backoff = self.policy.base_delay;
        Some(self.policy.watchdog_interval)
    }

    /// Transport error. Returns the delay before the next connect attempt,
    /// or `None` when there is nothing to recover (already disconnected).
    pub fn on_error(&mut self) -> Option<Duration> {
        match self.state {
            SessionState::Disconnected => None,
            SessionState::Connecting => {
                self.state = SessionState::Disconnected;
                self.retry_budget = self.retry_budget.saturating_sub(1);
                let grown = self.policy.grow(self.current_backoff, self.retry_budget);
                if grown != self.current_backoff {
                    debug!(
                        delay_ms = grown.as_millis() as u64,
                        "retry budget spent, backoff doubled"
                    );
                }
                self.current_backoff = grown;
                Some(self.current_backoff)
            }
            SessionState::Connected => {
                self.reset();
                Some(self.policy.base_delay)
            }
        }
    }

    /// Transport closed. Same recovery as an error.
    pub fn on_close(&mut self) -> Option<Duration> {
        self.on_error()
    }

    /// Periodic liveness check. When the transport already reports
    /// closed/closing, the session resets and asks for an immediate
    /// reconnect.
    pub fn on_watchdog_tick(&mut self, transport_closed: bool) -> Option<Duration> {
        if !self.watchdog_armed || self.state != SessionState::Connected || !transport_closed {
            return None;
        }
        self.reset();
        Some(Duration::ZERO)
    }

    fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.watchdog_armed = false;
        self.current_backoff = self.policy.base_delay;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn retry_budget(&self) -> i64 {
        self.retry_budget
    }

    pub fn current_backoff(&self) -> Duration {
        self.current_backoff
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog_armed
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}
