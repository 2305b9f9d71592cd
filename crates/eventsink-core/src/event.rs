//! Event data model.
//!
//! `NewEvent` is what a client submits; `StoredEvent` is what the store hands
//! back after assigning identity and receipt time. Nothing mutates a
//! `StoredEvent` after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{EventSinkError, Result};

/// Message returned for any body that cannot become an event.
pub const INVALID_EVENT_MSG: &str = "invalid json (need type, payload)";

/// Client-provided event candidate.
///
/// Unknown fields are ignored, so a client-supplied `id` or `received_at`
/// never reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: String,
}

/// `null` decodes the same as an absent field.
fn null_as_empty<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Option::unwrap_or_default)
}

impl NewEvent {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { kind: kind.into(), payload: payload.into() }
    }

    /// Reject candidates without a type.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(EventSinkError::BadRequest(INVALID_EVENT_MSG.into()));
        }
        Ok(())
    }
}

/// Fully populated event as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}
