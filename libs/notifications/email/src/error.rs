//! Error types for notification dispatch.

use core_config::ConfigError;
use messaging::{ErrorCategory, ProcessingError};
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// One send that did not go through.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub to: String,
    pub error: NotificationError,
}

/// Errors that can occur while rendering or delivering notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Email provider failed in a way that may succeed later.
    #[error("Email provider error ({provider}): {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Provider refused the message; resending the same message will not help.
    #[error("Email rejected ({provider}): {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },

    /// Provider asked us to slow down.
    #[error("Email provider rate limited ({provider}): {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },

    /// The send was aborted because the host is shutting down.
    #[error("Send cancelled")]
    Cancelled,

    /// Template registration or rendering error.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// At least one send of an event failed; the others were still attempted.
    #[error("Failed to deliver {} email(s) for {event_type}", .failures.len())]
    Delivery {
        event_type: String,
        failures: Vec<DeliveryFailure>,
    },
}

impl NotificationError {
    /// How the queue should treat a message that failed with this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            NotificationError::Provider { .. } | NotificationError::Cancelled => {
                ErrorCategory::Transient
            }
            NotificationError::RateLimited { .. } => ErrorCategory::RateLimited,
            NotificationError::Rejected { .. }
            | NotificationError::Template(_)
            | NotificationError::Config(_) => ErrorCategory::Permanent,
            NotificationError::Delivery { failures, .. } => {
                let categories: Vec<ErrorCategory> =
                    failures.iter().map(|f| f.error.category()).collect();
                if categories.contains(&ErrorCategory::RateLimited) {
                    ErrorCategory::RateLimited
                } else if categories.iter().all(|c| *c == ErrorCategory::Permanent) {
                    ErrorCategory::Permanent
                } else {
                    ErrorCategory::Transient
                }
            }
        }
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<NotificationError> for ProcessingError {
    fn from(err: NotificationError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::Permanent => ProcessingError::permanent_with_source(message, err),
            ErrorCategory::RateLimited => ProcessingError::rate_limited(message),
            ErrorCategory::Transient => ProcessingError::transient_with_source(message, err),
        }
    }
}
