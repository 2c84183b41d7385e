//! Per-event handlers and the dispatch table that routes to them.
//!
//! A handler is a pure function from an event's data to the emails it wants
//! sent. It never talks to a sender; recipients whose address is missing
//! come back as [`PlannedEmail::Skip`] so the dispatcher can log them.

use crate::fields::{EventData, MissingField};
use crate::templates::{DetailSet, NotificationContent};
use std::collections::HashMap;

pub const USER_REGISTERED: &str = "UserRegistered";
pub const LISTING_CREATED: &str = "ListingCreated";
pub const APPLICATION_CREATED: &str = "ApplicationCreated";
pub const VIEWING_APPROVED: &str = "ViewingApproved";
pub const LISTING_APPROVED: &str = "ListingApproved";

const DEFAULT_ROLE: &str = "Applicant";

/// One email a handler wants sent, or the reason it cannot be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedEmail {
    Send {
        to: String,
        content: NotificationContent,
    },
    Skip(MissingField),
}

/// Maps event data to the emails to send.
pub type Handler = fn(&EventData) -> Vec<PlannedEmail>;

/// Closed mapping from event-type tag to handler. Lookups are case-sensitive.
#[derive(Clone)]
pub struct DispatchTable {
    handlers: HashMap<&'static str, Handler>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register (or replace) the handler for `event_type`.
    pub fn register(mut self, event_type: &'static str, handler: Handler) -> Self {
        self.handlers.insert(event_type, handler);
        self
    }

    pub fn handler_for(&self, event_type: &str) -> Option<Handler> {
        self.handlers.get(event_type).copied()
    }

    /// Registered event types, sorted.
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl Default for DispatchTable {
    /// The listing platform's events.
    fn default() -> Self {
        Self::empty()
            .register(USER_REGISTERED, user_registered)
            .register(LISTING_CREATED, listing_created)
            .register(APPLICATION_CREATED, application_created)
            .register(VIEWING_APPROVED, viewing_approved)
            .register(LISTING_APPROVED, listing_approved)
    }
}

/// `"<prefix>: <title>"`, or just the prefix when there is no title.
fn titled(prefix: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}: {title}")
    }
}

fn content(subject: String, intro: &str, details: DetailSet, footer: &str) -> NotificationContent {
    NotificationContent {
        subject,
        intro: intro.to_string(),
        details,
        footer: footer.to_string(),
    }
}

fn plan(
    data: &EventData,
    recipient_field: &'static str,
    build: impl FnOnce() -> NotificationContent,
) -> PlannedEmail {
    match data.require(recipient_field) {
        Ok(to) => PlannedEmail::Send {
            to,
            content: build(),
        },
        Err(missing) => PlannedEmail::Skip(missing),
    }
}

pub fn user_registered(data: &EventData) -> Vec<PlannedEmail> {
    vec![plan(data, "email", || {
        content(
            "Welcome! Your account is ready".to_string(),
            "Thanks for registering. Your account has been created.",
            DetailSet::new()
                .with("Email", data.get("email"))
                .with("Role", data.get_or("role", DEFAULT_ROLE)),
            "You can now sign in and start exploring listings.",
        )
    })]
}

pub fn listing_created(data: &EventData) -> Vec<PlannedEmail> {
    vec![plan(data, "ownerEmail", || {
        content(
            titled("Listing created", &data.get("title")),
            "Your listing has been created successfully.",
            DetailSet::new()
                .with("Title", data.get("title"))
                .with("Location", data.get("location"))
                .with("Price", data.get("price")),
            "We will let you know as soon as applicants show interest.",
        )
    })]
}

/// Two independent emails: a receipt to the applicant and a heads-up to the owner.
pub fn application_created(data: &EventData) -> Vec<PlannedEmail> {
    let listing_title = data.get("listingTitle");

    let applicant = plan(data, "applicantEmail", || {
        content(
            titled("Application received", &listing_title),
            "We have received your application.",
            DetailSet::new().with("Listing", listing_title.clone()),
            "The owner will review your application and get back to you.",
        )
    });

    let owner = plan(data, "ownerEmail", || {
        content(
            titled("New application", &listing_title),
            "A new application has been submitted for your listing.",
            DetailSet::new()
                .with("Listing", listing_title.clone())
                .with("Applicant", data.get("applicantEmail")),
            "Sign in to review the application.",
        )
    });

    vec![applicant, owner]
}

pub fn viewing_approved(data: &EventData) -> Vec<PlannedEmail> {
    vec![plan(data, "applicantEmail", || {
        let listing_title = data.get("listingTitle");
        content(
            titled("Viewing approved", &listing_title),
            "Good news! Your viewing request has been approved.",
            DetailSet::new().with("Listing", listing_title),
            "Please contact the owner if you need to reschedule.",
        )
    })]
}

pub fn listing_approved(data: &EventData) -> Vec<PlannedEmail> {
    vec![plan(data, "applicantEmail", || {
        let listing_title = data.get("listingTitle");
        content(
            titled("Listing approved", &listing_title),
            "The listing has been approved and is now available.",
            DetailSet::new().with("Listing", listing_title),
            "Sign in to see the latest details.",
        )
    })]
}
