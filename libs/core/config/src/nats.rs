use crate::{env_or_default, ConfigError, FromEnv};

/// NATS JetStream connection and queue configuration
#[derive(Clone, Debug)]
pub struct NatsConfig {
    pub url: String,
    /// JetStream stream holding the notification events
    pub stream: String,
    pub subject: String,
    /// Durable consumer name shared by all worker replicas
    pub consumer: String,
}

impl NatsConfig {
    pub fn new(url: String, stream: String) -> Self {
        Self {
            url,
            stream,
            ..Default::default()
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream: "NOTIFICATIONS".to_string(),
            subject: "notifications.>".to_string(),
            consumer: "notifications-worker".to_string(),
        }
    }
}

impl FromEnv for NatsConfig {
    /// Reads from environment variables with defaults:
    /// - NATS_URL: nats://localhost:4222
    /// - NOTIFICATIONS_STREAM: NOTIFICATIONS
    /// - NOTIFICATIONS_SUBJECT: notifications.>
    /// - NOTIFICATIONS_CONSUMER: notifications-worker
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            url: env_or_default("NATS_URL", &defaults.url),
            stream: env_or_default("NOTIFICATIONS_STREAM", &defaults.stream),
            subject: env_or_default("NOTIFICATIONS_SUBJECT", &defaults.subject),
            consumer: env_or_default("NOTIFICATIONS_CONSUMER", &defaults.consumer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nats_config_from_env_with_defaults() {
        temp_env::with_vars(
            [
                ("NATS_URL", None::<&str>),
                ("NOTIFICATIONS_STREAM", None),
                ("NOTIFICATIONS_SUBJECT", None),
                ("NOTIFICATIONS_CONSUMER", None),
            ],
            || {
                let config = NatsConfig::from_env().unwrap();
                assert_eq!(config.url, "nats://localhost:4222");
                assert_eq!(config.stream, "NOTIFICATIONS");
                assert_eq!(config.subject, "notifications.>");
                assert_eq!(config.consumer, "notifications-worker");
            },
        );
    }

    #[test]
    fn test_nats_config_from_env_with_custom_values() {
        temp_env::with_vars(
            [
                ("NATS_URL", Some("nats://queue.internal:4222")),
                ("NOTIFICATIONS_STREAM", Some("LISTING_EVENTS")),
            ],
            || {
                let config = NatsConfig::from_env().unwrap();
                assert_eq!(config.url, "nats://queue.internal:4222");
                assert_eq!(config.stream, "LISTING_EVENTS");
            },
        );
    }

    #[test]
    fn test_nats_config_new() {
        let config = NatsConfig::new("nats://prod:4222".to_string(), "EVENTS".to_string());
        assert_eq!(config.url, "nats://prod:4222");
        assert_eq!(config.stream, "EVENTS");
        assert_eq!(config.consumer, "notifications-worker");
    }
}
