//! Lenient access to an event's `data` payload.
//!
//! Publishers are not schema-validated, so every lookup tolerates absent,
//! null or wrong-typed values and degrades to an empty string.

use serde_json::{Map, Value};
use std::fmt;

/// A required field was absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField {
    pub field: &'static str,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required field `{}`", self.field)
    }
}

impl std::error::Error for MissingField {}

/// The `data` object of an envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData(Map<String, Value>);

impl EventData {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// String form of `name`, or `""` when it is absent or not a string/number.
    ///
    /// Keys are matched exactly first, then ASCII case-insensitively.
    pub fn get(&self, name: &str) -> String {
        let value = self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        });

        match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Trimmed value of `name`, failing when it is blank.
    pub fn require(&self, name: &'static str) -> Result<String, MissingField> {
        let value = self.get(name);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(MissingField { field: name })
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// Value of `name`, or `default` when it is blank.
    pub fn get_or(&self, name: &str, default: &str) -> String {
        let value = self.get(name);
        if value.trim().is_empty() {
            default.to_string()
        } else {
            value
        }
    }
}
