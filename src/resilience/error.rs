//! Failure classification for outbound calls

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a single outbound call or by the retry loop around it
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("service unavailable: circuit breaker is open")]
    CircuitOpen,

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<CallError> },
}

impl CallError {
    /// Returns true if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::RateLimited(_) | Self::Transient(_)
        )
    }

    /// Maps a non-success HTTP status to a failure class
    ///
    /// | Status | Class |
    /// |--------|-------|
    /// | 401, 403 | AuthenticationFailed |
    /// | 429 | RateLimited |
    /// | 408, 5xx | Transient |
    /// | other | Rejected |
    pub fn from_status(status: u16, context: &str) -> Self {
        let message = if context.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, context)
        };

        match status {
            401 | 403 => Self::AuthenticationFailed(message),
            429 => Self::RateLimited(message),
            408 | 500..=599 => Self::Transient(message),
            _ => Self::Rejected(message),
        }
    }

    /// Classifies a reqwest transport error
    ///
    /// DNS resolution failures are reported as `NetworkUnreachable` so the retry
    /// loop gives up early; everything else on the wire is transient.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if is_dns_failure(err) {
            return Self::NetworkUnreachable(err.to_string());
        }

        if err.is_timeout() {
            Self::Transient(format!("request timeout: {}", err))
        } else if err.is_connect() {
            Self::Transient(format!("connection failed: {}", err))
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), "")
        } else {
            Self::Transient(err.to_string())
        }
    }

    /// The innermost cause, looking through `ExhaustedRetries`
    pub fn root(&self) -> &CallError {
        match self {
            Self::ExhaustedRetries { last, .. } => last.root(),
            other => other,
        }
    }
}

fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return true;
        }
        source = cause.source();
    }
    false
}
