//! Sender configuration loaded from the environment.

use core_config::{env_or_default, env_parse_or, env_required, ConfigError, Environment, FromEnv};
use std::fmt;
use std::str::FromStr;

/// Identity used in the `From` header of every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    pub from_email: String,
    pub from_name: String,
}

impl SenderConfig {
    pub fn new(from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
            from_name: from_name.into(),
        }
    }
}

impl FromEnv for SenderConfig {
    /// `EMAIL_FROM_ADDRESS` is required; the worker must not start without it.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            from_email: env_required("EMAIL_FROM_ADDRESS")?,
            from_name: env_or_default("EMAIL_FROM_NAME", "Notifications"),
        })
    }
}

/// Which [`EmailSender`](crate::EmailSender) to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Smtp,
    SendGrid,
    Log,
}

impl ProviderKind {
    /// `EMAIL_PROVIDER`, or SendGrid in production and SMTP everywhere else.
    pub fn from_env(environment: &Environment) -> Result<Self, ConfigError> {
        match std::env::var("EMAIL_PROVIDER") {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ if environment.is_production() => Ok(ProviderKind::SendGrid),
            _ => Ok(ProviderKind::Smtp),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(ProviderKind::Smtp),
            "sendgrid" => Ok(ProviderKind::SendGrid),
            "log" => Ok(ProviderKind::Log),
            other => Err(ConfigError::ParseError {
                key: "EMAIL_PROVIDER".to_string(),
                details: format!("unknown provider `{other}`, expected smtp, sendgrid or log"),
            }),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Smtp => write!(f, "smtp"),
            ProviderKind::SendGrid => write!(f, "sendgrid"),
            ProviderKind::Log => write!(f, "log"),
        }
    }
}

/// SMTP connection settings.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

impl SmtpSettings {
    /// Local Mailpit/MailHog: no auth, no TLS.
    pub fn local(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            use_tls: false,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl FromEnv for SmtpSettings {
    /// Defaults to an unauthenticated relay on `localhost:1025`.
    fn from_env() -> Result<Self, ConfigError> {
        let use_tls = matches!(
            env_or_default("SMTP_USE_TLS", "false")
                .to_ascii_lowercase()
                .as_str(),
            "true" | "1" | "yes"
        );

        Ok(Self {
            host: env_or_default("SMTP_HOST", "localhost"),
            port: env_parse_or("SMTP_PORT", 1025)?,
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            use_tls,
        })
    }
}

/// SendGrid credentials.
#[derive(Clone)]
pub struct SendGridSettings {
    pub api_key: String,
}

impl fmt::Debug for SendGridSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridSettings")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl FromEnv for SendGridSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("SENDGRID_API_KEY")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_config_requires_from_address() {
        temp_env::with_vars_unset(["EMAIL_FROM_ADDRESS", "EMAIL_FROM_NAME"], || {
            let err = SenderConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "EMAIL_FROM_ADDRESS"));
        });
    }

    #[test]
    fn test_sender_config_from_env() {
        temp_env::with_vars(
            [
                ("EMAIL_FROM_ADDRESS", Some("noreply@listings.example")),
                ("EMAIL_FROM_NAME", None),
            ],
            || {
                let config = SenderConfig::from_env().unwrap();
                assert_eq!(config.from_email, "noreply@listings.example");
                assert_eq!(config.from_name, "Notifications");
            },
        );
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("smtp".parse::<ProviderKind>().unwrap(), ProviderKind::Smtp);
        assert_eq!(" SendGrid ".parse::<ProviderKind>().unwrap(), ProviderKind::SendGrid);
        assert_eq!("LOG".parse::<ProviderKind>().unwrap(), ProviderKind::Log);
        assert!("ses".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_defaults_by_environment() {
        temp_env::with_var_unset("EMAIL_PROVIDER", || {
            assert_eq!(
                ProviderKind::from_env(&Environment::Production).unwrap(),
                ProviderKind::SendGrid
            );
            assert_eq!(
                ProviderKind::from_env(&Environment::Development).unwrap(),
                ProviderKind::Smtp
            );
        });

        temp_env::with_var("EMAIL_PROVIDER", Some("log"), || {
            assert_eq!(
                ProviderKind::from_env(&Environment::Production).unwrap(),
                ProviderKind::Log
            );
        });
    }

    #[test]
    fn test_smtp_settings_defaults() {
        temp_env::with_vars_unset(
            ["SMTP_HOST", "SMTP_PORT", "SMTP_USERNAME", "SMTP_PASSWORD", "SMTP_USE_TLS"],
            || {
                let settings = SmtpSettings::from_env().unwrap();
                assert_eq!(settings.host, "localhost");
                assert_eq!(settings.port, 1025);
                assert!(!settings.use_tls);
                assert!(settings.username.is_empty());
            },
        );
    }

    #[test]
    fn test_smtp_settings_rejects_bad_port() {
        temp_env::with_var("SMTP_PORT", Some("not-a-port"), || {
            assert!(SmtpSettings::from_env().is_err());
        });
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let settings = SendGridSettings {
            api_key: "SG.secret".to_string(),
        };
        assert!(!format!("{settings:?}").contains("SG.secret"));

        let mut smtp = SmtpSettings::local("localhost", 1025);
        smtp.password = "hunter2".to_string();
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }
}
