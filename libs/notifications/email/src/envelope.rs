//! Queue message envelope.

use crate::fields::EventData;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a raw message could not be turned into an [`Envelope`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope is missing `{0}`")]
    MissingField(&'static str),

    #[error("envelope field `{0}` has the wrong type")]
    InvalidField(&'static str),
}

/// One unit of work taken off the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub event_type: String,
    pub data: EventData,
    /// Advisory only.
    pub enqueued_at: Option<DateTime<Utc>>,
}

impl Envelope {
    /// Parse a raw queue payload. Top-level keys are matched case-insensitively.
    pub fn parse(raw: &[u8]) -> Result<Self, EnvelopeError> {
        let Value::Object(mut fields) = serde_json::from_slice::<Value>(raw)? else {
            return Err(EnvelopeError::NotAnObject);
        };

        let event_type = match take_field(&mut fields, "eventType") {
            Some(Value::String(event_type)) => event_type,
            None => return Err(EnvelopeError::MissingField("eventType")),
            Some(_) => return Err(EnvelopeError::InvalidField("eventType")),
        };

        let data = match take_field(&mut fields, "data") {
            Some(Value::Object(data)) => EventData::new(data),
            None => return Err(EnvelopeError::MissingField("data")),
            Some(_) => return Err(EnvelopeError::InvalidField("data")),
        };

        let enqueued_at = match take_field(&mut fields, "enqueuedAt") {
            Some(Value::String(ts)) => DateTime::parse_from_rfc3339(&ts)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        };

        Ok(Self {
            event_type,
            data,
            enqueued_at,
        })
    }
}

/// Remove `name` from `fields`, preferring an exact key. `null` reads as absent.
fn take_field(fields: &mut Map<String, Value>, name: &str) -> Option<Value> {
    let key = if fields.contains_key(name) {
        name.to_string()
    } else {
        fields
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))?
            .clone()
    };

    match fields.remove(&key)? {
        Value::Null => None,
        value => Some(value),
    }
}
