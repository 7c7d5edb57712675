//! Structured decision logging.
//!
//! The core does not persist a notification log to disk (that is the
//! dashboard's job) — it only emits one structured `tracing` event per
//! decision, with enough fields for an external collector to reconstruct the
//! decision's provenance.

use chrono::{DateTime, Utc};

use crate::event::{Decision, Event, ExplanationCode};

/// Emit one structured log event describing a decision.
#[allow(clippy::too_many_arguments)]
pub fn log_decision(
    event: &Event,
    decision: Decision,
    scheduled_time: Option<DateTime<Utc>>,
    explanation_code: ExplanationCode,
    reason: &str,
    matched_rule_id: Option<&str>,
    confidence: f64,
) {
    tracing::info!(
        user_id = %event.user_id,
        event_id = %event.event_id,
        event_type = event.event_type.as_str(),
        decision = decision.as_str(),
        scheduled_time = scheduled_time.map(|t| t.to_rfc3339()),
        explanation_code = explanation_code.as_str(),
        reason,
        matched_rule_id,
        confidence,
        "notification decision",
    );
}
