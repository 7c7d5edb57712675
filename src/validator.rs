//! Validates and normalizes a [`RawEvent`] into a canonical [`Event`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::event::{Channel, Event, EventType, PriorityHint, RawEvent};

/// Validate and normalize an untyped JSON value, for callers that don't
/// already have a [`RawEvent`] (e.g. an adapter deserializing straight off
/// the wire). A value that isn't a JSON object is rejected outright rather
/// than failing to deserialize into `RawEvent`'s fields one by one.
pub fn validate_value(value: &serde_json::Value) -> Result<Event, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    let raw: RawEvent = serde_json::from_value(value.clone()).map_err(|_| ValidationError::NotAnObject)?;
    validate(&raw)
}

/// Validate and normalize a raw event, filling in defaults.
///
/// Required: `user_id`, `event_type`, `message`, `timestamp`, `channel` —
/// missing or empty-string values are both rejected. `event_type`, `channel`,
/// and `priority_hint` (if present) must lie in their enumerated sets.
#[tracing::instrument(skip_all, fields(user_id = raw.user_id.as_deref()))]
pub fn validate(raw: &RawEvent) -> Result<Event, ValidationError> {
    let user_id = require_non_empty(raw.user_id.as_deref(), "user_id")?;
    let event_type_raw = require_non_empty(raw.event_type.as_deref(), "event_type")?;
    let message = require_non_empty(raw.message.as_deref(), "message")?;
    let timestamp_raw = require_non_empty(raw.timestamp.as_deref(), "timestamp")?;
    let channel_raw = require_non_empty(raw.channel.as_deref(), "channel")?;

    let event_type = EventType::parse(event_type_raw)
        .ok_or_else(|| ValidationError::InvalidEventType(event_type_raw.to_string()))?;
    let channel = Channel::parse(channel_raw)
        .ok_or_else(|| ValidationError::InvalidChannel(channel_raw.to_string()))?;

    let priority_hint = match raw.priority_hint.as_deref() {
        None | Some("") => None,
        Some(hint) => Some(
            PriorityHint::parse(hint)
                .ok_or_else(|| ValidationError::InvalidPriorityHint(hint.to_string()))?,
        ),
    };

    let timestamp = parse_timestamp(timestamp_raw)
        .map_err(|_| ValidationError::InvalidTimestamp(timestamp_raw.to_string()))?;

    let expires_at = match raw.expires_at.as_deref() {
        None | Some("") => None,
        Some(raw_expiry) => Some(
            parse_timestamp(raw_expiry)
                .map_err(|_| ValidationError::InvalidExpiresAt(raw_expiry.to_string()))?,
        ),
    };

    Ok(Event {
        event_id: raw
            .event_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: user_id.to_string(),
        event_type,
        title: raw.title.clone().unwrap_or_default(),
        message: message.to_string(),
        source: raw
            .source
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        priority_hint,
        channel,
        timestamp,
        expires_at,
        dedupe_key: raw.dedupe_key.clone().filter(|k| !k.is_empty()),
        metadata: raw.metadata.clone(),
    })
}

fn require_non_empty<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Parse an ISO-8601 timestamp, accepting a trailing `Z` as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
