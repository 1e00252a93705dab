//! Resilient wrapper for calls to volatile external services
//!
//! Every outbound page fetch, search probe, and completion request goes through
//! a [`ResilientCaller`], which provides:
//! - A per-attempt timeout (the in-flight future is dropped when it fires)
//! - Exponential backoff between retries, capped per call class
//! - A circuit breaker in front of the completion service
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Timeout, 5xx, connection error | Retry with backoff |
//! | HTTP 429 | Retry with doubled backoff |
//! | HTTP 401/403 | Fail immediately, counts against the breaker |
//! | DNS failure | Fail immediately |
//! | Other 4xx, bad payload | Fail immediately |

mod breaker;
mod error;

pub use breaker::{BreakerSnapshot, CircuitBreaker};
pub use error::CallError;

use crate::config::{CircuitBreakerConfig, ResilienceConfig};
use std::future::Future;
use std::time::Duration;

/// Base delay before the first retry
const BASE_BACKOFF: Duration = Duration::from_millis(1_000);

/// Kind of external service being called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Page fetches and HEAD probes
    Fetch,
    /// Text completion requests
    Completion,
}

impl CallClass {
    /// Ceiling on the backoff delay for this class
    pub fn backoff_cap(self) -> Duration {
        match self {
            Self::Fetch => Duration::from_millis(5_000),
            Self::Completion => Duration::from_millis(16_000),
        }
    }

    /// Only the completion service sits behind the circuit breaker
    pub fn uses_breaker(self) -> bool {
        matches!(self, Self::Completion)
    }
}

/// Per-call settings
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub class: CallClass,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// Delay before retry attempt `attempt` (1-based): `min(1s * 2^(attempt-1), cap)`
pub fn backoff_delay(attempt: u32, class: CallClass) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    BASE_BACKOFF
        .saturating_mul(1u32 << exponent)
        .min(class.backoff_cap())
}

pub struct ResilientCaller {
    max_retries: u32,
    fetch_timeout: Duration,
    completion_timeout: Duration,
    breaker: CircuitBreaker,
}

impl ResilientCaller {
    pub fn new(resilience: &ResilienceConfig, breaker: &CircuitBreakerConfig) -> Self {
        Self {
            max_retries: resilience.max_retries,
            fetch_timeout: resilience.fetch_timeout(),
            completion_timeout: resilience.completion_timeout(),
            breaker: CircuitBreaker::new(breaker),
        }
    }

    /// Default options for a call class, as configured
    pub fn options(&self, class: CallClass) -> CallOptions {
        let timeout = match class {
            CallClass::Fetch => self.fetch_timeout,
            CallClass::Completion => self.completion_timeout,
        };

        CallOptions {
            class,
            max_retries: self.max_retries,
            timeout,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `operation` with the configured defaults for `class`
    pub async fn call<T, F, Fut>(&self, class: CallClass, operation: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let options = self.options(class);
        self.call_with(&options, operation).await
    }

    /// Runs `operation` until it succeeds, fails terminally, or retries run out
    ///
    /// `operation` is invoked once per attempt and must produce a fresh future
    /// each time.
    pub async fn call_with<T, F, Fut>(
        &self,
        options: &CallOptions,
        mut operation: F,
    ) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let guarded = options.class.uses_breaker();
        if guarded {
            self.breaker.try_acquire()?;
        }

        let mut attempt: u32 = 0;
        loop {
            let error = match tokio::time::timeout(options.timeout, operation()).await {
                Ok(Ok(value)) => {
                    if guarded {
                        self.breaker.record_success();
                    }
                    if attempt > 0 {
                        tracing::info!("Call succeeded after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_) => CallError::Timeout(options.timeout),
            };

            if !error.is_retryable() {
                tracing::debug!("Call failed (non-retryable): {}", error);
                if guarded {
                    self.breaker.record_failure();
                }
                return Err(error);
            }

            if attempt >= options.max_retries {
                tracing::warn!(
                    "Call failed after {} attempts, giving up: {}",
                    attempt + 1,
                    error
                );
                if guarded {
                    self.breaker.record_failure();
                }
                return Err(CallError::ExhaustedRetries {
                    attempts: attempt + 1,
                    last: Box::new(error),
                });
            }

            attempt += 1;
            let mut delay = backoff_delay(attempt, options.class);
            if matches!(error, CallError::RateLimited(_)) {
                delay = delay.saturating_mul(2);
            }

            tracing::warn!(
                "Retry attempt {} after {:?}: {}",
                attempt,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
        }
    }
}
