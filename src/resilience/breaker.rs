//! Circuit breaker shared by every call through one `ResilientCaller`
//!
//! The breaker has no timer of its own. An open breaker is re-examined lazily
//! on the next call: once `reset_timeout` has passed since the last recorded
//! failure it closes and forgets the failure count.

use crate::config::CircuitBreakerConfig;
use crate::resilience::CallError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct BreakerState {
    failures: u32,
    last_failure: Option<Instant>,
    open: bool,
}

/// Point-in-time view of the breaker, mostly for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub failures: u32,
    pub is_open: bool,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            reset_timeout: config.reset_timeout(),
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Checks whether a call may proceed
    ///
    /// Returns `CallError::CircuitOpen` while the breaker is open and the
    /// cooldown has not elapsed. Otherwise resets an expired failure window and
    /// lets the call through.
    pub fn try_acquire(&self) -> Result<(), CallError> {
        let mut state = self.lock();
        let now = Instant::now();

        if let Some(last) = state.last_failure {
            if now.duration_since(last) >= self.reset_timeout {
                if state.open {
                    tracing::info!(
                        "Circuit breaker closing after {:?} cooldown",
                        self.reset_timeout
                    );
                }
                *state = BreakerState::default();
            } else if state.open {
                return Err(CallError::CircuitOpen);
            }
        }

        Ok(())
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failures = 0;
        state.open = false;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failures = state.failures.saturating_add(1);
        state.last_failure = Some(Instant::now());

        if !state.open && state.failures >= self.failure_threshold {
            state.open = true;
            tracing::warn!(
                "Circuit breaker opened after {} consecutive failures",
                state.failures
            );
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        BreakerSnapshot {
            failures: state.failures,
            is_open: state.open,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(&CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout_ms: reset_ms,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let breaker = breaker(2, 1_000);

        breaker.record_failure();
        assert!(!breaker.snapshot().is_open);
        assert!(breaker.try_acquire().is_ok());

        breaker.record_failure();
        assert!(breaker.snapshot().is_open);
        assert!(matches!(breaker.try_acquire(), Err(CallError::CircuitOpen)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_reset_after_timeout() {
        let breaker = breaker(1, 1_000);
        breaker.record_failure();

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(breaker.try_acquire().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(breaker.try_acquire().is_ok());
        assert_eq!(
            breaker.snapshot(),
            BreakerSnapshot {
                failures: 0,
                is_open: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_zeroes_failures() {
        let breaker = breaker(3, 1_000);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();

        assert_eq!(breaker.snapshot().failures, 0);
    }
}
