//! Error types for the NATS worker.

use thiserror::Error;

/// Error that can occur in NATS worker operations.
#[derive(Debug, Error)]
pub enum NatsError {
    /// NATS connection error
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::ConnectError),

    /// JetStream API error (stream/consumer management, fetch)
    #[error("JetStream error: {0}")]
    JetStream(String),

    /// Ack/nak/term failed
    #[error("Acknowledgement error: {0}")]
    Ack(String),

    /// Health server could not bind or serve
    #[error("Health server error: {0}")]
    Health(#[from] std::io::Error),
}

impl NatsError {
    /// Create a JetStream error from an async_nats error.
    pub fn from_jetstream_error(error: impl std::fmt::Display) -> Self {
        Self::JetStream(error.to_string())
    }

    /// Create an acknowledgement error.
    pub fn ack_error(error: impl std::fmt::Display) -> Self {
        Self::Ack(error.to_string())
    }
}
