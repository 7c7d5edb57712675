//! Keyword-scored stand-in for an LLM classifier, with a deterministic
//! fail-safe fallback. The real model's contract is specified here; its
//! internals (currently keyword heuristics) are freely replaceable.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::{Decision, Event, EventType, ExplanationCode, PriorityHint};

static URGENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"\botp\b", r"\bpassword\b", r"\b2fa\b", r"\bverif", r"\bdown\b", r"\boutage\b",
        r"\bcritical\b", r"\bemergency\b", r"\bsecurity\b", r"\bbreach\b", r"\bfailure\b",
        r"\bfailed\b", r"\bexpir", r"\bblocked\b", r"\bunauthorized\b", r"\b95%\b", r"\b100%\b",
        r"\b99%\b", r"\boverload\b", r"\bcrash", r"\berror\b", r"\balert\b",
    ])
});

static PROMO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"\bsale\b", r"\bdiscount\b", r"\b\d+%\s*off\b", r"\bflat\b", r"\bpromo", r"\bcoupon\b",
        r"\bdeal\b", r"\boffer\b", r"\bfree\b", r"\bclearance\b", r"\blimited.?time\b",
    ])
});

static LATER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"\breminder\b", r"\bsubmit\b", r"\bupdate\b", r"\bweekly\b", r"\bmonthly\b",
        r"\bsummary\b", r"\bdigest\b", r"\bnewsletter\b", r"\breport\b", r"\bschedul",
    ])
});

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("hard-coded regular expression to be valid"))
        .collect()
}

pub fn fallback_map(hint: PriorityHint) -> Decision {
    match hint {
        PriorityHint::Urgent => Decision::Now,
        PriorityHint::High => Decision::Now,
        PriorityHint::Medium => Decision::Later,
        PriorityHint::Low => Decision::Never,
    }
}

pub fn fallback_event_type_map(event_type: EventType) -> Decision {
    match event_type {
        EventType::Alert => Decision::Now,
        EventType::System => Decision::Now,
        EventType::Message => Decision::Later,
        EventType::Reminder => Decision::Later,
        EventType::Update => Decision::Later,
        EventType::Email => Decision::Later,
        EventType::Promotion => Decision::Never,
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub label: Decision,
    pub confidence: f64,
    pub raw_output: String,
    pub used_fallback: bool,
    pub explanation_code: ExplanationCode,
}

/// Keyword-scoring classifier with an injectable failure switch.
pub struct Classifier {
    simulate_failure: AtomicBool,
}

impl Classifier {
    pub fn new(simulate_failure: bool) -> Self {
        Classifier {
            simulate_failure: AtomicBool::new(simulate_failure),
        }
    }

    pub fn set_failure_mode(&self, enabled: bool) {
        self.simulate_failure.store(enabled, Ordering::SeqCst);
    }

    pub fn classify(&self, event: &Event) -> ClassificationResult {
        if self.simulate_failure.load(Ordering::SeqCst) {
            return self.fallback(event, "LLM service simulated failure");
        }
        self.score(event)
    }

    fn score(&self, event: &Event) -> ClassificationResult {
        let text = event.combined_text().to_lowercase();

        let mut urgent_score = URGENT_PATTERNS.iter().filter(|re| re.is_match(&text)).count() as i64;
        let mut promo_score = PROMO_PATTERNS.iter().filter(|re| re.is_match(&text)).count() as i64;
        let mut later_score = LATER_PATTERNS.iter().filter(|re| re.is_match(&text)).count() as i64;

        match event.priority_hint {
            Some(PriorityHint::Urgent) => urgent_score += 3,
            Some(PriorityHint::High) => urgent_score += 2,
            Some(PriorityHint::Low) => promo_score += 2,
            _ => {}
        }

        match event.event_type {
            EventType::Alert | EventType::System => urgent_score += 2,
            EventType::Promotion => promo_score += 3,
            EventType::Reminder => later_score += 2,
            _ => {}
        }

        if matches!(event.channel, crate::event::Channel::Sms) {
            urgent_score += 1;
        }

        let total = (urgent_score + promo_score + later_score).max(1) as f64;

        let (label, confidence, explanation_code, reason) = if urgent_score > promo_score
            && urgent_score > later_score
        {
            let confidence = (0.5 + (urgent_score as f64 / total) * 0.5).min(0.99);
            let code = if urgent_score >= 2 {
                ExplanationCode::UrgentKeyword
            } else {
                ExplanationCode::LlmDecision
            };
            let reason = build_urgent_reason(&text, urgent_score, event);
            (Decision::Now, confidence, code, reason)
        } else if promo_score > urgent_score && promo_score > later_score {
            let confidence = (0.5 + (promo_score as f64 / total) * 0.5).min(0.99);
            (
                Decision::Never,
                confidence,
                ExplanationCode::LlmDecision,
                format!("Promotional content detected (score={promo_score})"),
            )
        } else if later_score > 0 {
            let confidence = (0.5 + (later_score as f64 / total) * 0.4).min(0.95);
            (
                Decision::Later,
                confidence,
                ExplanationCode::LlmDecision,
                format!("Non-urgent, schedulable content (score={later_score})"),
            )
        } else {
            let label = fallback_event_type_map(event.event_type);
            (
                label,
                0.5,
                ExplanationCode::LlmDecision,
                format!("Default classification for {}", event.event_type.as_str()),
            )
        };

        let confidence = round2(confidence);
        let raw_output = format!(
            "LABEL:{}; SHORT_REASON:{}; CONFIDENCE:{:.2}",
            label.as_str(),
            reason,
            confidence
        );

        ClassificationResult {
            label,
            confidence,
            raw_output,
            used_fallback: false,
            explanation_code,
        }
    }

    fn fallback(&self, event: &Event, reason: &str) -> ClassificationResult {
        let label = match event.priority_hint {
            Some(hint) => fallback_map(hint),
            None => fallback_event_type_map(event.event_type),
        };
        ClassificationResult {
            label,
            confidence: 0.4,
            raw_output: format!("FALLBACK: {reason} -> {}", label.as_str()),
            used_fallback: true,
            explanation_code: ExplanationCode::Fallback,
        }
    }
}

fn build_urgent_reason(text: &str, score: i64, event: &Event) -> String {
    let mut parts = Vec::new();
    if text.contains("otp") {
        parts.push("contains OTP".to_string());
    }
    if text.contains("down") {
        parts.push("service outage detected".to_string());
    }
    if text.contains("95%") || text.contains("99%") || text.contains("100%") {
        parts.push("resource threshold critical".to_string());
    }
    if event.priority_hint == Some(PriorityHint::Urgent) {
        parts.push("priority=urgent".to_string());
    }
    if matches!(event.event_type, EventType::Alert | EventType::System) {
        parts.push(format!("event_type={}", event.event_type.as_str()));
    }
    if parts.is_empty() {
        parts.push(format!("urgency score={score}"));
    }
    format!("Urgent: {}", parts.join(", "))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Channel;
    use chrono::Utc;

    fn event_with(title: &str, message: &str, priority: Option<PriorityHint>, event_type: EventType, channel: Channel) -> Event {
        Event {
            event_id: "e1".to_string(),
            user_id: "u1".to_string(),
            event_type,
            title: title.to_string(),
            message: message.to_string(),
            source: "unknown".to_string(),
            priority_hint: priority,
            channel,
            timestamp: Utc::now(),
            expires_at: None,
            dedupe_key: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn otp_message_is_now_with_urgent_keyword_code() {
        let classifier = Classifier::new(false);
        let event = event_with(
            "Your OTP is 445566",
            "Use OTP 445566 to verify your login",
            Some(PriorityHint::Urgent),
            EventType::Message,
            Channel::Sms,
        );
        let result = classifier.classify(&event);
        assert_eq!(result.label, Decision::Now);
        assert_eq!(result.explanation_code, ExplanationCode::UrgentKeyword);
    }

    #[test]
    fn promo_event_is_never() {
        let classifier = Classifier::new(false);
        let event = event_with(
            "Flat 70% OFF",
            "Summer sale ends soon",
            Some(PriorityHint::Low),
            EventType::Promotion,
            Channel::Push,
        );
        let result = classifier.classify(&event);
        assert_eq!(result.label, Decision::Never);
    }

    #[test]
    fn server_down_alert_is_now() {
        let classifier = Classifier::new(false);
        let event = event_with(
            "URGENT: Server is down",
            "srv-42 unreachable",
            Some(PriorityHint::Urgent),
            EventType::Alert,
            Channel::Push,
        );
        let result = classifier.classify(&event);
        assert_eq!(result.label, Decision::Now);
        assert_eq!(result.explanation_code, ExplanationCode::UrgentKeyword);
    }

    #[test]
    fn simulated_failure_uses_fallback_map() {
        let classifier = Classifier::new(true);
        let event = event_with(
            "Your OTP is 445566",
            "Use OTP 445566 to verify your login",
            Some(PriorityHint::Urgent),
            EventType::Message,
            Channel::Sms,
        );
        let result = classifier.classify(&event);
        assert_eq!(result.label, Decision::Now);
        assert!(result.used_fallback);
        assert_eq!(result.explanation_code, ExplanationCode::Fallback);
    }

    #[test]
    fn no_keywords_falls_back_to_event_type_default() {
        let classifier = Classifier::new(false);
        let event = event_with("", "just some plain text", None, EventType::Message, Channel::Push);
        let result = classifier.classify(&event);
        assert_eq!(result.label, Decision::Later);
    }
}
