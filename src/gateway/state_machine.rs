//! Retry / fallback state machine for a single order-creation call.
//!
//! ```text
//!            ┌──── 5xx / no response, attempt < max ────┐
//!            ▼                                           │
//! TryHost(i, n) ──ok──▶ Success                    Backoff(i, n) ──sleep n×base──▶ TryHost(i, n+1)
//!      │  │
//!      │  └── 4xx ──▶ Rejected
//!      │
//!      └── budget spent / other error ──▶ Fallback(i+1) ──▶ TryHost(i+1, 1)
//!                                         (no host left) ──▶ Exhausted
//! ```
//!
//! Transitions are pure; the gateway drives them and does the I/O.

use std::time::Duration;

use crate::{
    consts::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS},
    errors::TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    /// Issue attempt `attempt` (1-based) against host `host`
    TryHost { host: usize, attempt: u32 },
    /// Attempt `attempt` on `host` failed transiently; wait before retrying
    Backoff { host: usize, attempt: u32 },
    /// Move on to `host`
    Fallback { host: usize },
    Success,
    Rejected,
    Exhausted,
}

impl SubmitState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmitState::Success | SubmitState::Rejected | SubmitState::Exhausted
        )
    }
}

/// Per-host retry budget and linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per host (default: 3)
    pub max_attempts: u32,
    /// Backoff after attempt n is `n × backoff_base` (default: 1s)
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Initial state for `host_count` candidate hosts.
    pub fn start(&self, host_count: usize) -> SubmitState {
        if host_count == 0 {
            SubmitState::Exhausted
        } else {
            SubmitState::TryHost {
                host: 0,
                attempt: 1,
            }
        }
    }

    /// Next state after attempt `attempt` on `host` failed with `err`.
    pub fn on_failure(
        &self,
        host: usize,
        attempt: u32,
        err: &TransportError,
        host_count: usize,
    ) -> SubmitState {
        if err.is_client_error() {
            return SubmitState::Rejected;
        }
        if err.is_transient() && attempt < self.max_attempts {
            return SubmitState::Backoff { host, attempt };
        }
        Self::fallback(host + 1, host_count)
    }

    /// Next state once the backoff sleep has elapsed.
    pub fn after_backoff(&self, host: usize, attempt: u32) -> SubmitState {
        SubmitState::TryHost {
            host,
            attempt: attempt + 1,
        }
    }

    /// Next state when moving on to `host`.
    pub fn after_fallback(&self, host: usize) -> SubmitState {
        SubmitState::TryHost { host, attempt: 1 }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    fn fallback(next: usize, host_count: usize) -> SubmitState {
        if next < host_count {
            SubmitState::Fallback { host: next }
        } else {
            SubmitState::Exhausted
        }
    }
}
