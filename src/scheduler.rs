//! Computes the scheduled time for `LATER` decisions, honoring quiet hours,
//! frequency backoff, and expiration.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

use crate::config::Config;
use crate::event::{Event, EventType, ExplanationCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    At(DateTime<Utc>),
    Expired,
}

/// Compute when a `LATER` decision should fire.
///
/// Branches, in order: quiet-hour-aware rule override, frequency backoff,
/// reminder working-hour scheduling, default 15-minute delay. Any result
/// landing after `event.expires_at` collapses to [`ScheduleOutcome::Expired`].
pub fn compute_scheduled_time(
    event: &Event,
    explanation_code: ExplanationCode,
    frequency_count: usize,
    config: &Config,
) -> ScheduleOutcome {
    let ts = event.timestamp;

    let scheduled = if explanation_code == ExplanationCode::RuleOverride {
        if is_quiet_hour(ts.hour(), config) {
            next_morning(ts, config.quiet_resume_hour)
        } else {
            ts + Duration::minutes(15)
        }
    } else if explanation_code == ExplanationCode::FrequencyLimit {
        let backoff = config.base_backoff_minutes * (frequency_count as i64 - 3).max(1);
        ts + Duration::minutes(backoff)
    } else if event.event_type == EventType::Reminder {
        next_working_hour(ts, config.default_working_hour)
    } else {
        ts + Duration::minutes(15)
    };

    match event.expires_at {
        Some(expires_at) if scheduled > expires_at => ScheduleOutcome::Expired,
        _ => ScheduleOutcome::At(scheduled),
    }
}

fn is_quiet_hour(hour: u32, config: &Config) -> bool {
    if config.quiet_hour_start > config.quiet_hour_end {
        hour >= config.quiet_hour_start || hour < config.quiet_hour_end
    } else {
        hour >= config.quiet_hour_start && hour < config.quiet_hour_end
    }
}

fn next_morning(ts: DateTime<Utc>, resume_hour: u32) -> DateTime<Utc> {
    let next_day = (ts + Duration::days(1)).date_naive();
    let time = NaiveTime::from_hms_opt(resume_hour, 0, 0).expect("valid hour 0..24");
    DateTime::from_naive_utc_and_offset(next_day.and_time(time), Utc)
}

fn next_working_hour(ts: DateTime<Utc>, working_hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(working_hour, 0, 0).expect("valid hour 0..24");
    if ts.hour() < working_hour {
        DateTime::from_naive_utc_and_offset(ts.date_naive().and_time(time), Utc)
    } else {
        let next_day = (ts + Duration::days(1)).date_naive();
        DateTime::from_naive_utc_and_offset(next_day.and_time(time), Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Channel, PriorityHint};
    use chrono::TimeZone;

    fn event_at(hour: u32, event_type: EventType, expires_at: Option<DateTime<Utc>>) -> Event {
        Event {
            event_id: "e1".to_string(),
            user_id: "u1".to_string(),
            event_type,
            title: "".to_string(),
            message: "".to_string(),
            source: "unknown".to_string(),
            priority_hint: Some(PriorityHint::Medium),
            channel: Channel::Push,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap(),
            expires_at,
            dedupe_key: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn default_branch_adds_15_minutes() {
        let config = Config::default();
        let event = event_at(12, EventType::Message, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::LlmDecision, 0, &config);
        assert_eq!(
            outcome,
            ScheduleOutcome::At(event.timestamp + Duration::minutes(15))
        );
    }

    #[test]
    fn rule_override_during_quiet_hour_schedules_next_morning() {
        let config = Config::default();
        let event = event_at(23, EventType::Message, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::RuleOverride, 0, &config);
        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(outcome, ScheduleOutcome::At(expected));
    }

    #[test]
    fn rule_override_outside_quiet_hour_adds_15_minutes() {
        let config = Config::default();
        let event = event_at(12, EventType::Message, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::RuleOverride, 0, &config);
        assert_eq!(
            outcome,
            ScheduleOutcome::At(event.timestamp + Duration::minutes(15))
        );
    }

    #[test]
    fn frequency_limit_backs_off_exponentially() {
        let config = Config::default();
        let event = event_at(12, EventType::Message, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::FrequencyLimit, 6, &config);
        // base=5, max(1, 6-3)=3 -> 15 minutes
        assert_eq!(
            outcome,
            ScheduleOutcome::At(event.timestamp + Duration::minutes(15))
        );
    }

    #[test]
    fn reminder_schedules_next_working_hour_same_day() {
        let config = Config::default();
        let event = event_at(7, EventType::Reminder, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::LlmDecision, 0, &config);
        let expected = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(outcome, ScheduleOutcome::At(expected));
    }

    #[test]
    fn reminder_after_working_hour_rolls_to_tomorrow() {
        let config = Config::default();
        let event = event_at(14, EventType::Reminder, None);
        let outcome = compute_scheduled_time(&event, ExplanationCode::LlmDecision, 0, &config);
        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap();
        assert_eq!(outcome, ScheduleOutcome::At(expected));
    }

    #[test]
    fn beyond_expiry_collapses_to_expired() {
        let config = Config::default();
        let expiry = Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap();
        let event = event_at(12, EventType::Message, Some(expiry));
        let outcome = compute_scheduled_time(&event, ExplanationCode::LlmDecision, 0, &config);
        assert_eq!(outcome, ScheduleOutcome::Expired);
    }

    #[test]
    fn quiet_hour_boundary_start_is_quiet_end_is_not() {
        let config = Config::default();
        assert!(is_quiet_hour(22, &config));
        assert!(!is_quiet_hour(6, &config));
    }
}
