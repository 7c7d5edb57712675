//! Decision Engine — orchestrates validation, dedupe, classification, rules,
//! frequency/noise damping, and scheduling for a single event, updating
//! history as it goes.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::classifier::Classifier;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dedupe::{DuplicateDetector, DuplicateOutcome};
use crate::event::{
    Decision, Event, ExplanationCode, HistoryRecord, InputEventView, OutputRecord, RawEvent,
};
use crate::history::HistoryStore;
use crate::logging::log_decision;
use crate::rules::RuleSet;
use crate::scheduler::{compute_scheduled_time, ScheduleOutcome};
use crate::validator;

/// Processes notification events end-to-end and produces delivery decisions.
///
/// Safe to call concurrently: each `process_event` call is atomic with
/// respect to the history store, guarded by a single lock (see the crate's
/// concurrency model). The pipeline itself has no I/O and no suspension
/// points, so the API is synchronous.
pub struct DecisionEngine {
    config: Config,
    history: Mutex<HistoryStore>,
    dedupe: DuplicateDetector,
    rules: Mutex<RuleSet>,
    classifier: Classifier,
    clock: Arc<dyn Clock>,
}

impl DecisionEngine {
    pub fn new(config: Config, rules: RuleSet, simulate_llm_failure: bool) -> Self {
        Self::with_clock(config, rules, simulate_llm_failure, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        rules: RuleSet,
        simulate_llm_failure: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = HistoryStore::new(config.history_buffer_size);
        let dedupe = DuplicateDetector::new(config.dedupe_window_minutes, config.text_similarity_threshold);
        DecisionEngine {
            config,
            history: Mutex::new(history),
            dedupe,
            rules: Mutex::new(rules),
            classifier: Classifier::new(simulate_llm_failure),
            clock,
        }
    }

    pub fn from_rules_path(config: Config, rules_path: &Path, simulate_llm_failure: bool) -> Self {
        let rules = RuleSet::load_file_or_empty(rules_path);
        Self::new(config, rules, simulate_llm_failure)
    }

    /// Process a single event through the full pipeline.
    #[tracing::instrument(skip_all)]
    pub fn process_event(&self, raw: &RawEvent) -> OutputRecord {
        // ── Step 1: Validate ──────────────────────────────────────────
        let event = match validator::validate(raw) {
            Ok(event) => event,
            Err(err) => {
                return OutputRecord {
                    input_event: serde_json::to_value(raw).unwrap_or(serde_json::Value::Null),
                    decision: Decision::Never,
                    scheduled_time: None,
                    explanation_code: ExplanationCode::ValidationError,
                    reason: format!("Invalid event: {err}"),
                    matched_rule_id: None,
                };
            }
        };

        let now = self.clock.now();

        // ── Step 2: Duplicate check ────────────────────────────────────
        {
            let history = self.history.lock();
            let dup = self.dedupe.check(&event, &history, now);
            if let DuplicateOutcome::Duplicate {
                explanation_code,
                matched_event_id,
            } = dup
            {
                drop(history);
                let reason = format!(
                    "Duplicate suppressed: {} (matched {})",
                    explanation_code.as_str(),
                    matched_event_id.chars().take(8).collect::<String>()
                );
                self.record_history(&event, Decision::Never, explanation_code);
                log_decision(&event, Decision::Never, None, explanation_code, &reason, None, 0.0);
                return self.output(&event, Decision::Never, None, explanation_code, reason, None);
            }
        }

        // ── Step 3: Classify ────────────────────────────────────────────
        let classification = self.classifier.classify(&event);
        let mut decision = classification.label;
        let mut explanation_code = classification.explanation_code;
        let mut reason = classification.raw_output.clone();
        let mut matched_rule_id: Option<String> = None;

        // ── Step 4: Rule match + apply ──────────────────────────────────
        {
            let rules = self.rules.lock();
            let matched = rules.match_event(&event);
            if !matched.is_empty() {
                let history = self.history.lock();
                let result = rules.apply_actions(&event, &matched, decision, &history, now);
                if let Some(code) = result.explanation_code {
                    decision = result.decision;
                    explanation_code = code;
                    matched_rule_id = result.matched_rule_id;
                    reason = result.reason.unwrap_or_default();
                }
            }
        }

        // ── Step 5: Frequency / alert fatigue ────────────────────────────
        let freq_count = {
            let history = self.history.lock();
            history.count_in_window(&event.user_id, now, self.config.frequency_window_minutes)
        };

        if freq_count >= self.config.frequency_limit as usize {
            if decision == Decision::Now {
                decision = Decision::Later;
                explanation_code = ExplanationCode::FrequencyLimit;
                reason = format!(
                    "Downgraded NOW->LATER: user {} received {} notifications in last {} min",
                    event.user_id, freq_count, self.config.frequency_window_minutes
                );
            } else if decision == Decision::Later
                && freq_count >= self.config.frequency_limit as usize + 2
            {
                decision = Decision::Never;
                explanation_code = ExplanationCode::FrequencySuppression;
                reason = format!(
                    "Suppressed: user {} received {} notifications (fatigue threshold)",
                    event.user_id, freq_count
                );
            }
        }

        // ── Step 6: Conflict / noise resolution ──────────────────────────
        if decision == Decision::Now {
            let urgent_count = {
                let history = self.history.lock();
                history.count_urgent_by_source_or_type(
                    &event.user_id,
                    now,
                    event.event_type,
                    &event.source,
                    self.config.noise_limit_window_minutes,
                )
            };
            if urgent_count >= self.config.noise_limit_max_urgent as usize {
                decision = Decision::Later;
                explanation_code = ExplanationCode::ConflictNoiseLimit;
                reason = format!(
                    "Noise limit: {} urgent {} events from {} in last {} min (limit={})",
                    urgent_count,
                    event.event_type.as_str(),
                    event.source,
                    self.config.noise_limit_window_minutes,
                    self.config.noise_limit_max_urgent
                );
            }
        }

        // ── Step 7: Schedule ──────────────────────────────────────────────
        let mut scheduled_time = None;
        if decision == Decision::Later {
            match compute_scheduled_time(&event, explanation_code, freq_count, &self.config) {
                ScheduleOutcome::Expired => {
                    decision = Decision::Never;
                    explanation_code = ExplanationCode::Expired;
                    reason = "Scheduled time exceeds expires_at -- notification expired".to_string();
                }
                ScheduleOutcome::At(time) => scheduled_time = Some(time),
            }
        }

        // ── Step 8: Log + history write ────────────────────────────────────
        log_decision(
            &event,
            decision,
            scheduled_time,
            explanation_code,
            &reason,
            matched_rule_id.as_deref(),
            classification.confidence,
        );
        self.record_history(&event, decision, explanation_code);

        self.output(&event, decision, scheduled_time, explanation_code, reason, matched_rule_id)
    }

    /// Process a batch of events sequentially, each observing the history
    /// updates produced by every earlier event in the batch.
    pub fn process_batch(&self, events: &[RawEvent]) -> Vec<OutputRecord> {
        events.iter().map(|event| self.process_event(event)).collect()
    }

    /// Toggle the classifier's simulated-failure switch. Takes effect on the
    /// next call to `process_event`.
    pub fn set_llm_failure(&self, enabled: bool) {
        self.classifier.set_failure_mode(enabled);
    }

    /// Hot-swap the rule set. Serialized against in-flight `process_event` calls.
    pub fn reload_rules(&self, rules: RuleSet) {
        *self.rules.lock() = rules;
    }

    /// Clear all per-user history.
    pub fn reset(&self) {
        self.history.lock().clear();
    }

    fn record_history(&self, event: &Event, decision: Decision, explanation_code: ExplanationCode) {
        let normalized_text = crate::dedupe::normalize_text(event.combined_text().trim());
        self.history.lock().add(
            &event.user_id,
            HistoryRecord {
                event_id: event.event_id.clone(),
                event_type: event.event_type,
                source: event.source.clone(),
                decision,
                explanation_code,
                dedupe_key: event.dedupe_key.clone(),
                normalized_text,
                timestamp: event.timestamp,
            },
        );
    }

    fn output(
        &self,
        event: &Event,
        decision: Decision,
        scheduled_time: Option<chrono::DateTime<chrono::Utc>>,
        explanation_code: ExplanationCode,
        reason: String,
        matched_rule_id: Option<String>,
    ) -> OutputRecord {
        let view = InputEventView::from(event);
        OutputRecord {
            input_event: serde_json::to_value(&view).unwrap_or(serde_json::Value::Null),
            decision,
            scheduled_time,
            explanation_code,
            reason,
            matched_rule_id,
        }
    }
}
