//! Processor trait for message handling.

use crate::error::ProcessingError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// One delivery attempt of a queued message.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Raw message body, exactly as published
    pub payload: Vec<u8>,
    /// Subject the message was published on
    pub subject: String,
    /// Stream sequence number (stable across redeliveries)
    pub sequence: u64,
    /// Delivery attempt, starting at 1
    pub attempt: u32,
}

impl Delivery {
    /// Create a first-attempt delivery (useful outside of a real queue).
    pub fn new(payload: impl Into<Vec<u8>>, subject: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            subject: subject.into(),
            sequence: 0,
            attempt: 1,
        }
    }

    /// Check if this is a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// Message processor trait.
///
/// Implement this trait to define how queued messages are handled. The
/// processor receives raw bytes so that decoding failures stay under its
/// control.
///
/// # Error Handling
///
/// - `Ok(())`: message is acknowledged
/// - `Transient` / `RateLimited`: message is redelivered after a backoff
/// - `Permanent`: message is terminated
///
/// The `cancel` token fires when the host is shutting down; long-running
/// calls should abort when it does.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Process one delivery.
    async fn process(
        &self,
        delivery: &Delivery,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessingError>;

    /// Get the processor name.
    ///
    /// Used for logging and metrics labels.
    fn name(&self) -> &'static str;

    /// Perform a health check.
    ///
    /// Override to check downstream service availability. This is used
    /// by the worker's readiness probe.
    async fn health_check(&self) -> Result<bool, ProcessingError> {
        Ok(true)
    }
}
