//! Email notifications for listing-platform events.
//!
//! Events arrive as JSON envelopes (`eventType`, `data`, `enqueuedAt`).
//! The [`EventDispatcher`] routes each one through a [`DispatchTable`] of
//! per-event handlers, renders the resulting [`NotificationContent`] into
//! plain-text and HTML bodies, and hands them to an [`EmailSender`].
//!
//! ```rust,ignore
//! use email_dispatch::{EventDispatcher, MockEmailSender};
//!
//! let sender = MockEmailSender::new();
//! let dispatcher = EventDispatcher::new(Arc::new(sender.clone()))?;
//! dispatcher.dispatch(payload, &CancellationToken::new()).await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod processor;
pub mod provider;
pub mod streams;
pub mod templates;

pub use config::{ProviderKind, SendGridSettings, SenderConfig, SmtpSettings};
pub use dispatcher::EventDispatcher;
pub use envelope::{Envelope, EnvelopeError};
pub use error::{DeliveryFailure, NotificationError, NotificationResult};
pub use fields::{EventData, MissingField};
pub use handlers::{DispatchTable, Handler, PlannedEmail};
pub use provider::{
    sender_from_env, EmailMessage, EmailSender, LogSender, MockEmailSender, SendGridSender,
    SentEmail, SmtpSender,
};
pub use streams::NotificationStream;
pub use templates::{DetailSet, NotificationContent, RenderedEmail, TemplateEngine, FOOTER_BAR};
