use crate::{env_parse_or, ConfigError, FromEnv};

/// Runtime knobs for a queue worker process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Upper bound on messages dispatched at the same time
    pub max_concurrency: usize,
    pub batch_size: usize,
    pub health_port: u16,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            batch_size: 10,
            health_port: 8081,
        }
    }
}

impl FromEnv for WorkerSettings {
    /// Reads from environment variables with sensible defaults:
    /// - NOTIFICATIONS_MAX_CONCURRENCY: 4 (must be at least 1)
    /// - NOTIFICATIONS_BATCH_SIZE: 10 (must be at least 1)
    /// - HEALTH_PORT: 8081
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_concurrency =
            env_parse_or("NOTIFICATIONS_MAX_CONCURRENCY", defaults.max_concurrency)?;
        let batch_size = env_parse_or("NOTIFICATIONS_BATCH_SIZE", defaults.batch_size)?;
        let health_port = env_parse_or("HEALTH_PORT", defaults.health_port)?;

        if max_concurrency == 0 {
            return Err(ConfigError::ParseError {
                key: "NOTIFICATIONS_MAX_CONCURRENCY".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        if batch_size == 0 {
            return Err(ConfigError::ParseError {
                key: "NOTIFICATIONS_BATCH_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            max_concurrency,
            batch_size,
            health_port,
        })
    }
}
