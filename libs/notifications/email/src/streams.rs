//! JetStream stream carrying notification events.

use messaging::nats::StreamConfig;

/// Domain events published by the listings services under `notifications.*`.
pub struct NotificationStream;

impl StreamConfig for NotificationStream {
    const STREAM_NAME: &'static str = "NOTIFICATIONS";

    /// Shared by every replica so each event is handled once.
    const CONSUMER_NAME: &'static str = "notifications-worker";

    const SUBJECT: &'static str = "notifications.>";

    const MAX_DELIVER: i64 = 5;

    const ACK_WAIT_SECS: u64 = 30;
}
