//! Configuration for NATS JetStream workers.

use std::time::Duration;

/// Stream configuration trait (type-safe constants).
///
/// Implement this trait to define your stream's NATS defaults.
///
/// # Example
///
/// ```rust,ignore
/// struct AuditStream;
///
/// impl StreamConfig for AuditStream {
///     const STREAM_NAME: &'static str = "AUDIT";
///     const CONSUMER_NAME: &'static str = "audit-worker";
///     const SUBJECT: &'static str = "audit.>";
/// }
/// ```
pub trait StreamConfig {
    /// JetStream stream name (e.g., "NOTIFICATIONS")
    const STREAM_NAME: &'static str;

    /// Durable consumer name, shared by every replica of the worker
    const CONSUMER_NAME: &'static str;

    /// Subject pattern (e.g., "notifications.>")
    const SUBJECT: &'static str = ">";

    /// Maximum deliveries before JetStream gives up on a message (default: 5)
    const MAX_DELIVER: i64 = 5;

    /// Ack wait timeout in seconds (default: 30)
    const ACK_WAIT_SECS: u64 = 30;
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// JetStream stream name
    pub stream_name: String,

    /// Durable consumer name
    pub consumer_name: String,

    /// Subject to subscribe to
    pub subject: String,

    /// Batch size for fetching messages
    pub batch_size: usize,

    /// Fetch timeout
    pub fetch_timeout: Duration,

    /// Maximum deliveries per message
    pub max_deliver: i64,

    /// Ack wait timeout
    pub ack_wait: Duration,

    /// Maximum messages processed at the same time
    pub max_concurrent_jobs: usize,

    /// Health server port
    pub health_port: u16,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stream_name: "JOBS".to_string(),
            consumer_name: "worker".to_string(),
            subject: ">".to_string(),
            batch_size: 10,
            fetch_timeout: Duration::from_secs(5),
            max_deliver: 5,
            ack_wait: Duration::from_secs(30),
            max_concurrent_jobs: 4,
            health_port: 8081,
        }
    }
}

impl WorkerConfig {
    /// Create a new worker configuration with the given stream name.
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            ..Default::default()
        }
    }

    /// Create from a StreamConfig trait.
    pub fn from_stream<S: StreamConfig>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_name: S::CONSUMER_NAME.to_string(),
            subject: S::SUBJECT.to_string(),
            max_deliver: S::MAX_DELIVER,
            ack_wait: Duration::from_secs(S::ACK_WAIT_SECS),
            ..Default::default()
        }
    }

    /// Set the stream name.
    pub fn with_stream_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    /// Set the consumer name.
    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    /// Set the subject filter.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the maximum concurrent jobs.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    /// Set the health server port.
    pub fn with_health_port(mut self, port: u16) -> Self {
        self.health_port = port;
        self
    }
}
