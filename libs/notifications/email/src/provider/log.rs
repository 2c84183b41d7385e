//! Sender that only logs, for running the worker without a mail server.

use super::{until_cancelled, EmailMessage, EmailSender, SentEmail};
use crate::config::SenderConfig;
use crate::error::NotificationResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

pub struct LogSender {
    sender: SenderConfig,
}

impl LogSender {
    pub fn new(sender: SenderConfig) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EmailSender for LogSender {
    async fn send(
        &self,
        email: &EmailMessage,
        cancel: &CancellationToken,
    ) -> NotificationResult<SentEmail> {
        until_cancelled(cancel, async {
            let message_id = format!("log-{}", Uuid::new_v4());
            info!(
                from = %self.sender.from_email,
                to = %email.to,
                subject = %email.subject,
                message_id = %message_id,
                body = %email.text_body,
                "Email not delivered (log provider)"
            );
            Ok(SentEmail { message_id })
        })
        .await
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let sender = LogSender::new(SenderConfig::new("noreply@example.com", "Notifications"));
        let email = EmailMessage {
            to: "a@x.com".to_string(),
            subject: "Welcome! Your account is ready".to_string(),
            text_body: "Thanks for registering.".to_string(),
            html_body: "<p>Thanks for registering.</p>".to_string(),
        };

        let sent = sender.send(&email, &CancellationToken::new()).await.unwrap();
        assert!(sent.message_id.starts_with("log-"));
        assert!(sender.health_check().await.unwrap());
    }
}
