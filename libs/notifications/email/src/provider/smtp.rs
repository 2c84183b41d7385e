//! SMTP sender using lettre

use super::{until_cancelled, EmailMessage, EmailSender, SentEmail};
use crate::config::{SenderConfig, SmtpSettings};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PROVIDER: &str = "smtp";

/// SMTP email sender
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    /// Build the transport. TLS relays always authenticate; plain relays
    /// authenticate only when a username is configured (Mailpit/MailHog need none).
    pub fn new(settings: SmtpSettings, sender: SenderConfig) -> NotificationResult<Self> {
        let from = from_mailbox(&sender)?;

        let credentials = (!settings.username.is_empty())
            .then(|| Credentials::new(settings.username.clone(), settings.password.clone()));

        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host).map_err(|e| {
                NotificationError::Provider {
                    provider: PROVIDER,
                    message: format!("failed to create SMTP relay: {e}"),
                }
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };

        let builder = builder.port(settings.port);
        let transport = match credentials {
            Some(credentials) => builder.credentials(credentials).build(),
            None => builder.build(),
        };

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &EmailMessage) -> NotificationResult<Message> {
        let to: Mailbox = email.to.parse().map_err(|e| NotificationError::Rejected {
            provider: PROVIDER,
            message: format!("invalid recipient address `{}`: {e}", email.to),
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::Rejected {
                provider: PROVIDER,
                message: format!("failed to build message: {e}"),
            })
    }
}

fn from_mailbox(sender: &SenderConfig) -> NotificationResult<Mailbox> {
    let address = sender.from_email.parse().map_err(|e| NotificationError::Rejected {
        provider: PROVIDER,
        message: format!("invalid from address `{}`: {e}", sender.from_email),
    })?;
    Ok(Mailbox::new(Some(sender.from_name.clone()), address))
}

fn classify(error: lettre::transport::smtp::Error) -> NotificationError {
    if error.is_permanent() {
        NotificationError::Rejected {
            provider: PROVIDER,
            message: error.to_string(),
        }
    } else {
        NotificationError::Provider {
            provider: PROVIDER,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(
        &self,
        email: &EmailMessage,
        cancel: &CancellationToken,
    ) -> NotificationResult<SentEmail> {
        let message = self.build_message(email)?;

        let response = until_cancelled(cancel, async {
            self.transport.send(message).await.map_err(classify)
        })
        .await?;

        let message_id = response
            .message()
            .next()
            .map(|line| line.to_string())
            .unwrap_or_default();

        debug!(to = %email.to, code = %response.code(), "SMTP relay accepted message");

        Ok(SentEmail { message_id })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        self.transport.test_connection().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SmtpSender {
        SmtpSender::new(
            SmtpSettings::local("localhost", 1025),
            SenderConfig::new("noreply@listings.example", "Listings"),
        )
        .unwrap()
    }

    fn email(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "New application: Loft".to_string(),
            text_body: "A new application has been submitted for your listing.".to_string(),
            html_body: "<p>A new application has been submitted for your listing.</p>".to_string(),
        }
    }

    #[test]
    fn test_build_multipart_message() {
        let message = sender().build_message(&email("owner@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: Listings <noreply@listings.example>"));
        assert!(raw.contains("To: owner@example.com"));
        assert!(raw.contains("Subject: New application: Loft"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let err = sender().build_message(&email("not an address")).unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { .. }));
    }

    #[test]
    fn test_invalid_from_address_fails_construction() {
        let result = SmtpSender::new(
            SmtpSettings::local("localhost", 1025),
            SenderConfig::new("nope", "Listings"),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sender().send(&email("owner@example.com"), &cancel).await;
        assert!(matches!(result, Err(NotificationError::Cancelled)));
    }
}
