use std::sync::Arc;

use chrono::{TimeZone, Utc};
use notify_triage::{Clock, Config, Decision, DecisionEngine, ExplanationCode, FixedClock, RawEvent, RuleSet};

fn raw_event(
    user_id: &str,
    event_type: &str,
    title: &str,
    message: &str,
    priority_hint: Option<&str>,
    channel: &str,
    timestamp: &str,
) -> RawEvent {
    RawEvent {
        event_id: None,
        user_id: Some(user_id.to_string()),
        event_type: Some(event_type.to_string()),
        title: Some(title.to_string()),
        message: Some(message.to_string()),
        source: Some("test-source".to_string()),
        priority_hint: priority_hint.map(|s| s.to_string()),
        channel: Some(channel.to_string()),
        timestamp: Some(timestamp.to_string()),
        expires_at: None,
        dedupe_key: None,
        metadata: serde_json::Value::Null,
    }
}

fn engine_at(timestamp: &str) -> DecisionEngine {
    let instant = chrono::DateTime::parse_from_rfc3339(timestamp)
        .unwrap()
        .with_timezone(&Utc);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(instant));
    DecisionEngine::with_clock(Config::default(), RuleSet::empty(), false, clock)
}

#[test]
fn otp_message_is_delivered_now_with_urgent_keyword_code() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let event = raw_event(
        "user-1",
        "message",
        "Your OTP code",
        "Your OTP is 118822, use it to verify your login",
        Some("urgent"),
        "sms",
        "2026-01-01T12:00:00Z",
    );
    let output = engine.process_event(&event);
    assert_eq!(output.decision, Decision::Now);
    assert_eq!(output.explanation_code, ExplanationCode::UrgentKeyword);
}

#[test]
fn promotional_event_is_never_delivered() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let event = raw_event(
        "user-2",
        "promotion",
        "Flat 70% off",
        "Summer clearance sale ends soon, grab the deal now",
        Some("low"),
        "push",
        "2026-01-01T12:00:00Z",
    );
    let output = engine.process_event(&event);
    assert_eq!(output.decision, Decision::Never);
    assert_eq!(output.explanation_code, ExplanationCode::LlmDecision);
}

#[test]
fn server_down_alert_is_delivered_now() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let event = raw_event(
        "user-3",
        "alert",
        "URGENT: production server is down",
        "srv-42 is unreachable, disk usage at 99%",
        Some("urgent"),
        "push",
        "2026-01-01T12:00:00Z",
    );
    let output = engine.process_event(&event);
    assert_eq!(output.decision, Decision::Now);
    assert_eq!(output.explanation_code, ExplanationCode::UrgentKeyword);
}

#[test]
fn six_alerts_from_one_source_exhaust_noise_then_frequency_limits() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let messages = [
        "srv-1 is unreachable, connection refused",
        "database replica failed over unexpectedly",
        "disk usage at 95%, cleanup required",
        "memory overload detected on worker pool",
        "api gateway crash loop in progress",
        "auth service security breach detected",
    ];
    let mut outputs = Vec::new();
    for message in messages {
        let event = raw_event(
            "user-4",
            "alert",
            "Critical production alert",
            message,
            Some("urgent"),
            "push",
            "2026-01-01T12:00:00Z",
        );
        outputs.push(engine.process_event(&event));
    }

    // first two urgent alerts from this source are delivered immediately.
    assert_eq!(outputs[0].decision, Decision::Now);
    assert_eq!(outputs[1].decision, Decision::Now);
    // the noise limit (2 urgent NOWs per source in the window) kicks in next.
    assert_eq!(outputs[2].decision, Decision::Later);
    assert_eq!(outputs[2].explanation_code, ExplanationCode::ConflictNoiseLimit);
    assert_eq!(outputs[3].decision, Decision::Later);
    assert_eq!(outputs[3].explanation_code, ExplanationCode::ConflictNoiseLimit);
    assert_eq!(outputs[4].decision, Decision::Later);
    assert_eq!(outputs[4].explanation_code, ExplanationCode::ConflictNoiseLimit);
    // by the 6th event, overall frequency (5 in the window) takes over instead.
    assert_eq!(outputs[5].decision, Decision::Later);
    assert_eq!(outputs[5].explanation_code, ExplanationCode::FrequencyLimit);
}

#[test]
fn llm_failure_falls_back_to_priority_hint_map() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    engine.set_llm_failure(true);
    let event = raw_event(
        "user-5",
        "message",
        "Heads up",
        "Something worth knowing happened",
        Some("urgent"),
        "push",
        "2026-01-01T12:00:00Z",
    );
    let output = engine.process_event(&event);
    assert_eq!(output.decision, Decision::Now);
    assert_eq!(output.explanation_code, ExplanationCode::Fallback);
}

#[test]
fn replayed_dedupe_key_is_suppressed_as_duplicate() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let mut event = raw_event(
        "user-6",
        "message",
        "Order shipped",
        "Your order #9981 has shipped",
        Some("medium"),
        "email",
        "2026-01-01T12:00:00Z",
    );
    event.dedupe_key = Some("order-9981-shipped".to_string());

    let first = engine.process_event(&event);
    assert_ne!(first.explanation_code, ExplanationCode::DuplicateDedupeKey);

    let replay = engine.process_event(&event);
    assert_eq!(replay.decision, Decision::Never);
    assert_eq!(replay.explanation_code, ExplanationCode::DuplicateDedupeKey);
}

#[test]
fn validation_failure_echoes_raw_input_and_never_delivers() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let mut event = raw_event(
        "user-7",
        "message",
        "hi",
        "missing timestamp test",
        None,
        "push",
        "2026-01-01T12:00:00Z",
    );
    event.timestamp = None;

    let output = engine.process_event(&event);
    assert_eq!(output.decision, Decision::Never);
    assert_eq!(output.explanation_code, ExplanationCode::ValidationError);
    assert_eq!(
        output.input_event.get("message").and_then(|v| v.as_str()),
        Some("missing timestamp test")
    );
}

#[test]
fn rule_override_forces_decision_regardless_of_classification() {
    let engine_without_rules = engine_at("2026-01-01T12:00:00Z");
    let rules_doc = r#"[{
        "id": "mute-promotions",
        "priority": 100,
        "match": {"event_type": ["message"]},
        "action": {"force_decision": "NEVER"}
    }]"#;
    let rules = RuleSet::from_json_str(rules_doc).unwrap();
    engine_without_rules.reload_rules(rules);

    let event = raw_event(
        "user-8",
        "message",
        "Your OTP code",
        "Your OTP is 445566",
        Some("urgent"),
        "sms",
        "2026-01-01T12:00:00Z",
    );
    let output = engine_without_rules.process_event(&event);
    assert_eq!(output.decision, Decision::Never);
    assert_eq!(output.explanation_code, ExplanationCode::RuleOverride);
    assert_eq!(output.matched_rule_id.as_deref(), Some("mute-promotions"));
}

#[test]
fn reset_clears_history_so_dedupe_key_no_longer_matches() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let mut event = raw_event(
        "user-9",
        "message",
        "Weekly digest",
        "Here is your weekly summary report",
        Some("medium"),
        "email",
        "2026-01-01T12:00:00Z",
    );
    event.dedupe_key = Some("weekly-digest".to_string());

    engine.process_event(&event);
    engine.reset();
    let after_reset = engine.process_event(&event);
    assert_ne!(after_reset.explanation_code, ExplanationCode::DuplicateDedupeKey);
}

#[test]
fn sustained_later_volume_eventually_hits_frequency_suppression() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    // Distinct wording per event so the duplicate detector (Step 2) never
    // short-circuits the pipeline before the frequency stage (Step 5) runs.
    let messages = [
        "Please submit your weekly report by end of day",
        "Monthly summary of account activity is ready for review",
        "Your digest of recent project updates is attached",
        "Newsletter roundup for the engineering team this week",
        "Schedule a time to go over the quarterly numbers",
        "Reminder to update your on-call rotation for next month",
        "Weekly team report has been compiled for your review",
        "Summary of open action items from this week's standups",
    ];
    let mut last = None;
    for message in messages {
        let event = raw_event(
            "user-11",
            "reminder",
            "Weekly summary",
            message,
            Some("medium"),
            "email",
            "2026-01-01T12:00:00Z",
        );
        last = Some(engine.process_event(&event));
    }
    let last = last.unwrap();
    // 8th event observes 7 prior records in the 10-minute frequency window,
    // at or past FREQUENCY_LIMIT + 2 -- LATER is suppressed to NEVER.
    assert_eq!(last.decision, Decision::Never);
    assert_eq!(last.explanation_code, ExplanationCode::FrequencySuppression);
}

#[test]
fn process_batch_applies_history_across_the_batch() {
    let engine = engine_at("2026-01-01T12:00:00Z");
    let mut event = raw_event(
        "user-10",
        "message",
        "Order shipped",
        "Your order #42 has shipped",
        Some("medium"),
        "email",
        "2026-01-01T12:00:00Z",
    );
    event.dedupe_key = Some("order-42-shipped".to_string());

    let outputs = engine.process_batch(&[event.clone(), event]);
    assert_ne!(outputs[0].explanation_code, ExplanationCode::DuplicateDedupeKey);
    assert_eq!(outputs[1].decision, Decision::Never);
    assert_eq!(outputs[1].explanation_code, ExplanationCode::DuplicateDedupeKey);
}

