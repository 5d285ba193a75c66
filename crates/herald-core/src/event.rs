//! Event values published into the dispatcher.
//!
//! An [`Event`] is an immutable fact produced by an external publisher: a type
//! tag such as `"order.created"`, an opaque JSON payload, and the time it
//! occurred. Events are consumed by the dispatcher and the plugin runner and
//! are not retained beyond a dispatch call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_type: String,
    payload: Value,
    occurred_at: DateTime<Utc>,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self::at(event_type, payload, Utc::now())
    }

    /// Creates an event with an explicit occurrence timestamp.
    pub fn at(event_type: impl Into<String>, payload: Value, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            occurred_at,
        }
    }

    /// The event type tag used for subscription matching.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The opaque event payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// When the event occurred.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl fmt::Display for Event {
    /// Renders `Event: <type> - <payload JSON>`, the default notification content.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event: {} - {}", self.event_type, self.payload)
    }
}
