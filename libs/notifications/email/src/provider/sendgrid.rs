//! SendGrid sender
//!
//! Sends emails via the SendGrid v3 HTTP API.

use super::{until_cancelled, EmailMessage, EmailSender, SentEmail};
use crate::config::{SendGridSettings, SenderConfig};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// SendGrid API endpoint
const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

const PROVIDER: &str = "sendgrid";

/// SendGrid email sender
pub struct SendGridSender {
    api_key: String,
    sender: SenderConfig,
    client: Client,
    endpoint: String,
}

impl SendGridSender {
    pub fn new(settings: SendGridSettings, sender: SenderConfig) -> Self {
        Self {
            api_key: settings.api_key,
            sender,
            client: Client::new(),
            endpoint: SENDGRID_API_URL.to_string(),
        }
    }

    /// Point the sender at a different API base, e.g. a local stub.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body<'a>(&'a self, email: &'a EmailMessage) -> SendGridRequest<'a> {
        SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: &email.to,
                    name: None,
                }],
            }],
            from: EmailAddress {
                email: &self.sender.from_email,
                name: Some(&self.sender.from_name),
            },
            subject: &email.subject,
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: &email.text_body,
                },
                Content {
                    content_type: "text/html",
                    value: &email.html_body,
                },
            ],
        }
    }

    async fn post(&self, email: &EmailMessage) -> NotificationResult<SentEmail> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await
            .map_err(|e| NotificationError::Provider {
                provider: PROVIDER,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_success() {
            // SendGrid returns message ID in X-Message-Id header
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Ok(SentEmail { message_id });
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "SendGrid rejected request");
        Err(classify_status(status, &body))
    }
}

/// 429 is rate limiting, 400 is a request we should never resend, the rest may recover.
fn classify_status(status: StatusCode, body: &str) -> NotificationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => NotificationError::RateLimited {
            provider: PROVIDER,
            message: "rate limit exceeded".to_string(),
        },
        StatusCode::BAD_REQUEST => NotificationError::Rejected {
            provider: PROVIDER,
            message: format!("invalid request: {body}"),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NotificationError::Provider {
            provider: PROVIDER,
            message: "authentication failed".to_string(),
        },
        _ => NotificationError::Provider {
            provider: PROVIDER,
            message: format!("unexpected status {status}: {body}"),
        },
    }
}

/// SendGrid API request payload
#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[async_trait]
impl EmailSender for SendGridSender {
    async fn send(
        &self,
        email: &EmailMessage,
        cancel: &CancellationToken,
    ) -> NotificationResult<SentEmail> {
        until_cancelled(cancel, self.post(email)).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(!self.api_key.is_empty())
    }
}
