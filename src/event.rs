//! Canonical, validated event and decision types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification event as it arrives from upstream adapters, before validation.
///
/// Every field is optional at this stage — [`crate::validator::validate`] is
/// the only place that turns this into a canonical [`Event`].
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RawEvent {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub priority_hint: Option<String>,
    pub channel: Option<String>,
    pub timestamp: Option<String>,
    pub expires_at: Option<String>,
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    Reminder,
    Alert,
    Promotion,
    System,
    Update,
    Email,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Reminder => "reminder",
            EventType::Alert => "alert",
            EventType::Promotion => "promotion",
            EventType::System => "system",
            EventType::Update => "update",
            EventType::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "message" => EventType::Message,
            "reminder" => EventType::Reminder,
            "alert" => EventType::Alert,
            "promotion" => EventType::Promotion,
            "system" => EventType::System,
            "update" => EventType::Update,
            "email" => EventType::Email,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Push,
    Email,
    Sms,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::InApp => "in_app",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "push" => Channel::Push,
            "email" => Channel::Email,
            "sms" => Channel::Sms,
            "in_app" => Channel::InApp,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityHint {
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityHint::Low => "low",
            PriorityHint::Medium => "medium",
            PriorityHint::High => "high",
            PriorityHint::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "low" => PriorityHint::Low,
            "medium" => PriorityHint::Medium,
            "high" => PriorityHint::High,
            "urgent" => PriorityHint::Urgent,
            _ => return None,
        })
    }
}

/// A canonical, immutable notification event. Only produced by
/// [`crate::validator::validate`].
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event_id: String,
    pub user_id: String,
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub source: String,
    pub priority_hint: Option<PriorityHint>,
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub dedupe_key: Option<String>,
    pub metadata: serde_json::Value,
}

impl Event {
    /// `title` and `message` concatenated, the raw input to the near-duplicate
    /// normalizer and to the keyword classifier.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.message)
    }
}

/// The three terminal delivery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Now,
    Later,
    Never,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Now => "NOW",
            Decision::Later => "LATER",
            Decision::Never => "NEVER",
        }
    }
}

/// The closed set of explanation codes a decision can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExplanationCode {
    ValidationError,
    DuplicateDedupeKey,
    DuplicateTextSimilar,
    LlmDecision,
    UrgentKeyword,
    Fallback,
    RuleOverride,
    FrequencyLimit,
    FrequencySuppression,
    ConflictNoiseLimit,
    Expired,
}

impl ExplanationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationCode::ValidationError => "VALIDATION_ERROR",
            ExplanationCode::DuplicateDedupeKey => "DUPLICATE_DEDUPE_KEY",
            ExplanationCode::DuplicateTextSimilar => "DUPLICATE_TEXT_SIMILAR",
            ExplanationCode::LlmDecision => "LLM_DECISION",
            ExplanationCode::UrgentKeyword => "URGENT_KEYWORD",
            ExplanationCode::Fallback => "FALLBACK",
            ExplanationCode::RuleOverride => "RULE_OVERRIDE",
            ExplanationCode::FrequencyLimit => "FREQUENCY_LIMIT",
            ExplanationCode::FrequencySuppression => "FREQUENCY_SUPPRESSION",
            ExplanationCode::ConflictNoiseLimit => "CONFLICT_NOISE_LIMIT",
            ExplanationCode::Expired => "EXPIRED",
        }
    }
}

/// One decision per processed event, retained in the per-user history ring.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub event_id: String,
    pub event_type: EventType,
    pub source: String,
    pub decision: Decision,
    pub explanation_code: ExplanationCode,
    pub dedupe_key: Option<String>,
    pub normalized_text: String,
    pub timestamp: DateTime<Utc>,
}

/// The output of `process_event`: the decision plus everything needed to
/// explain it, per the pipeline's external interface contract.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    /// The input event echoed back, cleaned of internal-only fields. For a
    /// validation failure this is the caller's raw, unvalidated event; for
    /// every other outcome it is the canonical event with `event_id` removed
    /// (matching the original reference implementation's `get_output_record`).
    pub input_event: serde_json::Value,
    pub decision: Decision,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub explanation_code: ExplanationCode,
    pub reason: String,
    pub matched_rule_id: Option<String>,
}

/// A clean view of a validated event for the output record — excludes the
/// internal `event_id`, matching the original reference implementation's
/// `get_output_record`, which strips `event_id` and `parsed_timestamp` from
/// the echoed input.
#[derive(Debug, Clone, Serialize)]
pub struct InputEventView {
    pub user_id: String,
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub source: String,
    pub priority_hint: Option<PriorityHint>,
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub dedupe_key: Option<String>,
    pub metadata: serde_json::Value,
}

impl From<&Event> for InputEventView {
    fn from(event: &Event) -> Self {
        InputEventView {
            user_id: event.user_id.clone(),
            event_type: event.event_type,
            title: event.title.clone(),
            message: event.message.clone(),
            source: event.source.clone(),
            priority_hint: event.priority_hint,
            channel: event.channel,
            timestamp: event.timestamp,
            expires_at: event.expires_at,
            dedupe_key: event.dedupe_key.clone(),
            metadata: event.metadata.clone(),
        }
    }
}
