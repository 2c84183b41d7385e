//! Recording sender for tests

use super::{until_cancelled, EmailMessage, EmailSender, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Sender that captures every email instead of delivering it.
///
/// Clones share the same record, so a test can keep one handle while the
/// dispatcher owns another.
#[derive(Clone, Default)]
pub struct MockEmailSender {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failure: Option<String>,
    failing_recipients: HashSet<String>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every send fails with a transient provider error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fail only sends addressed to `to`.
    pub fn fail_for(mut self, to: impl Into<String>) -> Self {
        self.failing_recipients.insert(to.into());
        self
    }

    /// Emails accepted so far, in send order.
    pub async fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn was_sent_to(&self, to: &str) -> bool {
        self.sent.lock().await.iter().any(|e| e.to == to)
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    fn failure_for(&self, to: &str) -> Option<String> {
        if let Some(message) = &self.failure {
            return Some(message.clone());
        }
        self.failing_recipients
            .contains(to)
            .then(|| format!("mock failure for {to}"))
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(
        &self,
        email: &EmailMessage,
        cancel: &CancellationToken,
    ) -> NotificationResult<SentEmail> {
        until_cancelled(cancel, async {
            if let Some(message) = self.failure_for(&email.to) {
                return Err(NotificationError::Provider {
                    provider: "mock",
                    message,
                });
            }

            let mut sent = self.sent.lock().await;
            sent.push(email.clone());
            Ok(SentEmail {
                message_id: format!("mock-{}", sent.len()),
            })
        })
        .await
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(self.failure.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Test Subject".to_string(),
            text_body: "Test body".to_string(),
            html_body: "<p>Test body</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_sender_records_emails() {
        let sender = MockEmailSender::new();
        let cancel = CancellationToken::new();

        let sent = sender.send(&email("test@example.com"), &cancel).await.unwrap();
        assert_eq!(sent.message_id, "mock-1");

        let emails = sender.sent_emails().await;
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "test@example.com");
        assert!(sender.was_sent_to("test@example.com").await);
        assert!(!sender.was_sent_to("other@example.com").await);
    }

    #[tokio::test]
    async fn test_clones_share_the_record() {
        let sender = MockEmailSender::new();
        let handle = sender.clone();

        sender
            .send(&email("a@x.com"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handle.sent_count().await, 1);

        handle.clear().await;
        assert_eq!(sender.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_failing_sender() {
        let sender = MockEmailSender::failing("Simulated failure");

        let err = sender
            .send(&email("test@example.com"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Simulated failure"));
        assert_eq!(sender.sent_count().await, 0);
        assert!(!sender.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_for_single_recipient() {
        let sender = MockEmailSender::new().fail_for("bad@x.com");
        let cancel = CancellationToken::new();

        assert!(sender.send(&email("bad@x.com"), &cancel).await.is_err());
        assert!(sender.send(&email("good@x.com"), &cancel).await.is_ok());
        assert_eq!(sender.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_send_is_not_recorded() {
        let sender = MockEmailSender::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sender.send(&email("a@x.com"), &cancel).await;
        assert!(matches!(result, Err(NotificationError::Cancelled)));
        assert_eq!(sender.sent_count().await, 0);
    }
}
