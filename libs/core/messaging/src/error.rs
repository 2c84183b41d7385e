//! Error types for message processing.

use std::fmt;
use thiserror::Error;

/// Error categories determine what the queue does with the message.
///
/// # Categories
///
/// - **Transient**: Temporary failure, message is redelivered after a backoff
/// - **Permanent**: Unrecoverable, message is terminated (never redelivered)
/// - **RateLimited**: Upstream service rate limited, redelivered after a longer backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure (network timeout, provider unavailable, shutdown)
    /// Backoff 1-30s
    Transient,

    /// Permanent failure (payload the processor can never handle)
    Permanent,

    /// Rate limited by upstream service
    /// Backoff 5-120s
    RateLimited,
}

impl ErrorCategory {
    /// Get the base backoff delay in milliseconds.
    pub fn base_backoff_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 1000,   // 1s
            ErrorCategory::Permanent => 0,      // No redelivery
            ErrorCategory::RateLimited => 5000, // 5s
        }
    }

    /// Get the maximum backoff delay in milliseconds.
    pub fn max_backoff_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 30_000,    // 30s
            ErrorCategory::Permanent => 0,         // No redelivery
            ErrorCategory::RateLimited => 120_000, // 2 min
        }
    }

    /// Backoff before the next delivery, given how many attempts already failed.
    ///
    /// `failed_attempts` starts at 0 for the first failure.
    pub fn backoff_delay_ms(&self, failed_attempts: u32) -> u64 {
        if *self == ErrorCategory::Permanent {
            return 0;
        }

        let base = self.base_backoff_ms();
        let max = self.max_backoff_ms();
        let delay = base.saturating_mul(2u64.saturating_pow(failed_attempts));
        delay.min(max)
    }

    /// Whether the queue should deliver the message again.
    pub fn is_redeliverable(&self) -> bool {
        !matches!(self, ErrorCategory::Permanent)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transient => write!(f, "transient"),
            ErrorCategory::Permanent => write!(f, "permanent"),
            ErrorCategory::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Error returned by a [`Processor`](crate::Processor).
///
/// The category decides between redelivery with backoff and termination.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Transient error (network timeout, temporary unavailability)
    #[error("transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Permanent error (payload can never be processed)
    #[error("permanent error: {message}")]
    Permanent {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rate limited by upstream service
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },
}

impl ProcessingError {
    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient error with a source.
    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            source: None,
        }
    }

    /// Create a permanent error with a source.
    pub fn permanent_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Permanent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// Create a rate limited error with retry-after hint.
    pub fn rate_limited_with_retry(message: impl Into<String>, retry_after_ms: u64) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_ms: Some(retry_after_ms),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessingError::Transient { .. } => ErrorCategory::Transient,
            ProcessingError::Permanent { .. } => ErrorCategory::Permanent,
            ProcessingError::RateLimited { .. } => ErrorCategory::RateLimited,
        }
    }

    /// Backoff before redelivery, honoring a retry-after hint when present.
    pub fn backoff_delay_ms(&self, failed_attempts: u32) -> u64 {
        if let ProcessingError::RateLimited {
            retry_after_ms: Some(ms),
            ..
        } = self
        {
            return *ms;
        }
        self.category().backoff_delay_ms(failed_attempts)
    }
}
