//! Email sender implementations

pub mod log;
pub mod mock;
pub mod sendgrid;
pub mod smtp;

pub use self::log::LogSender;
pub use mock::MockEmailSender;
pub use sendgrid::SendGridSender;
pub use smtp::SmtpSender;

use crate::config::{ProviderKind, SendGridSettings, SenderConfig, SmtpSettings};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::FromEnv;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A fully rendered email addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Result of sending an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Provider-specific message ID
    pub message_id: String,
}

/// Delivers rendered emails.
///
/// Shared by every concurrent dispatch, so implementations must be safe to
/// call from many tasks at once.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one email. Must return [`NotificationError::Cancelled`] promptly
    /// once `cancel` fires.
    async fn send(
        &self,
        email: &EmailMessage,
        cancel: &CancellationToken,
    ) -> NotificationResult<SentEmail>;

    /// Get provider name
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy
    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(true)
    }
}

/// Build the sender selected by `kind`, reading its settings from the environment.
pub fn sender_from_env(
    kind: ProviderKind,
    sender: SenderConfig,
) -> NotificationResult<Arc<dyn EmailSender>> {
    let sender: Arc<dyn EmailSender> = match kind {
        ProviderKind::Smtp => Arc::new(SmtpSender::new(SmtpSettings::from_env()?, sender)?),
        ProviderKind::SendGrid => Arc::new(SendGridSender::new(SendGridSettings::from_env()?, sender)),
        ProviderKind::Log => Arc::new(LogSender::new(sender)),
    };
    Ok(sender)
}

/// Run a transport call, abandoning it if `cancel` fires first.
pub(crate) async fn until_cancelled<T>(
    cancel: &CancellationToken,
    send: impl Future<Output = NotificationResult<T>>,
) -> NotificationResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NotificationError::Cancelled),
        result = send => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_until_cancelled_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = until_cancelled(&cancel, async { Ok::<_, NotificationError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_until_cancelled_aborts_pending_send() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = until_cancelled(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, NotificationError>(())
        })
        .await;

        assert!(matches!(result, Err(NotificationError::Cancelled)));
    }

    #[test]
    fn test_sender_from_env_builds_log_sender() {
        let sender = sender_from_env(
            ProviderKind::Log,
            SenderConfig::new("noreply@example.com", "Notifications"),
        )
        .unwrap();
        assert_eq!(sender.name(), "log");
    }

    #[test]
    fn test_sender_from_env_requires_sendgrid_key() {
        temp_env::with_var_unset("SENDGRID_API_KEY", || {
            let result = sender_from_env(
                ProviderKind::SendGrid,
                SenderConfig::new("noreply@example.com", "Notifications"),
            );
            assert!(matches!(result, Err(NotificationError::Config(_))));
        });
    }
}
