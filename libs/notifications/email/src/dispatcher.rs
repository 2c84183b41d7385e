//! Event dispatcher: raw queue payload in, emails out.
//!
//! Bad input never fails a message. A malformed envelope, an unknown event
//! type or a missing recipient is logged and dropped so poison messages do
//! not pile up in the stream. Sender failures do fail the message, after
//! every planned send has been attempted, so the queue can redeliver it.

use crate::envelope::Envelope;
use crate::error::{DeliveryFailure, NotificationError, NotificationResult};
use crate::handlers::{DispatchTable, PlannedEmail};
use crate::provider::{EmailMessage, EmailSender};
use crate::templates::{NotificationContent, TemplateEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Routes envelopes through the dispatch table to an [`EmailSender`].
pub struct EventDispatcher {
    table: DispatchTable,
    templates: TemplateEngine,
    sender: Arc<dyn EmailSender>,
}

impl EventDispatcher {
    /// Dispatcher for the standard event set.
    pub fn new(sender: Arc<dyn EmailSender>) -> NotificationResult<Self> {
        Self::with_table(DispatchTable::default(), sender)
    }

    pub fn with_table(
        table: DispatchTable,
        sender: Arc<dyn EmailSender>,
    ) -> NotificationResult<Self> {
        Ok(Self {
            table,
            templates: TemplateEngine::new()?,
            sender,
        })
    }

    pub fn sender(&self) -> &Arc<dyn EmailSender> {
        &self.sender
    }

    /// Handle one queue message.
    ///
    /// Returns `Err` only when a send failed; everything else is logged.
    /// Sends run one after another, and `cancel` is forwarded to each.
    pub async fn dispatch(&self, raw: &[u8], cancel: &CancellationToken) -> NotificationResult<()> {
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, bytes = raw.len(), "Dropping malformed envelope");
                return Ok(());
            }
        };

        let event_type = envelope.event_type.as_str();
        debug!(
            event_type = %event_type,
            enqueued_at = envelope.enqueued_at.map(|t| t.to_rfc3339()).as_deref(),
            "Dispatching event"
        );

        let Some(handler) = self.table.handler_for(event_type) else {
            warn!(event_type = %event_type, "Unrecognized event type, dropping message");
            return Ok(());
        };

        let mut failures = Vec::new();

        for planned in handler(&envelope.data) {
            match planned {
                PlannedEmail::Skip(missing) => {
                    warn!(
                        event_type = %event_type,
                        field = missing.field,
                        "Missing required field, email skipped"
                    );
                }
                PlannedEmail::Send { to, content } => {
                    if let Err(e) = self.deliver(event_type, &to, &content, cancel).await {
                        error!(
                            event_type = %event_type,
                            to = %to,
                            error = %e,
                            "Failed to send notification"
                        );
                        failures.push(DeliveryFailure { to, error: e });
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::Delivery {
                event_type: envelope.event_type,
                failures,
            })
        }
    }

    async fn deliver(
        &self,
        event_type: &str,
        to: &str,
        content: &NotificationContent,
        cancel: &CancellationToken,
    ) -> NotificationResult<()> {
        let rendered = self.templates.render(content)?;
        let email = EmailMessage {
            to: to.to_string(),
            subject: rendered.subject,
            text_body: rendered.plain_text_body,
            html_body: rendered.html_body,
        };

        let sent = self.sender.send(&email, cancel).await?;

        info!(
            event_type = %event_type,
            to = %email.to,
            subject = %email.subject,
            message_id = %sent.message_id,
            provider = self.sender.name(),
            "Notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SentEmail;
    use async_trait::async_trait;
    use mockall::{mock, Sequence};

    mock! {
        Sender {}

        #[async_trait]
        impl EmailSender for Sender {
            async fn send(
                &self,
                email: &EmailMessage,
                cancel: &CancellationToken,
            ) -> NotificationResult<SentEmail>;
            fn name(&self) -> &'static str;
            async fn health_check(&self) -> NotificationResult<bool>;
        }
    }

    fn accepted() -> NotificationResult<SentEmail> {
        Ok(SentEmail {
            message_id: "msg-1".to_string(),
        })
    }

    fn dispatcher(sender: MockSender) -> EventDispatcher {
        EventDispatcher::new(Arc::new(sender)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_are_sequential_and_ordered() {
        let mut sender = MockSender::new();
        let mut seq = Sequence::new();
        sender.expect_name().return_const("mock");
        sender
            .expect_send()
            .withf(|email, _| email.to == "a@x.com" && email.subject == "Application received: Loft")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| accepted());
        sender
            .expect_send()
            .withf(|email, _| email.to == "b@x.com" && email.subject == "New application: Loft")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| accepted());

        let raw = br#"{"eventType":"ApplicationCreated","data":{"applicantEmail":"a@x.com","ownerEmail":"b@x.com","listingTitle":"Loft"}}"#;
        dispatcher(sender)
            .dispatch(raw, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bad_input_never_reaches_sender() {
        let mut sender = MockSender::new();
        sender.expect_send().never();
        let dispatcher = dispatcher(sender);
        let cancel = CancellationToken::new();

        let inputs: [&[u8]; 6] = [
            b"{{{",
            b"null",
            br#"{"eventType":"PasswordReset","data":{"email":"a@x.com"}}"#,
            br#"{"eventType":"userregistered","data":{"email":"a@x.com"}}"#,
            br#"{"eventType":"UserRegistered","data":{"role":"Owner"}}"#,
            br#"{"eventType":"UserRegistered"}"#,
        ];

        for raw in inputs {
            assert!(dispatcher.dispatch(raw, &cancel).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_first_failure_does_not_block_second_send() {
        let mut sender = MockSender::new();
        sender.expect_name().return_const("mock");
        sender
            .expect_send()
            .withf(|email, _| email.to == "a@x.com")
            .times(1)
            .returning(|_, _| {
                Err(NotificationError::Provider {
                    provider: "mock",
                    message: "timeout".to_string(),
                })
            });
        sender
            .expect_send()
            .withf(|email, _| email.to == "b@x.com")
            .times(1)
            .returning(|_, _| accepted());

        let raw = br#"{"eventType":"ApplicationCreated","data":{"applicantEmail":"a@x.com","ownerEmail":"b@x.com"}}"#;
        let err = dispatcher(sender)
            .dispatch(raw, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            NotificationError::Delivery {
                event_type,
                failures,
            } => {
                assert_eq!(event_type, "ApplicationCreated");
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].to, "a@x.com");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_token_is_forwarded() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sender = MockSender::new();
        sender
            .expect_send()
            .withf(|_, cancel| cancel.is_cancelled())
            .times(1)
            .returning(|_, _| Err(NotificationError::Cancelled));

        let raw = br#"{"eventType":"ViewingApproved","data":{"applicantEmail":"a@x.com"}}"#;
        let err = dispatcher(sender).dispatch(raw, &cancel).await.unwrap_err();
        assert_eq!(err.category(), messaging::ErrorCategory::Transient);
    }
}
