//! Declarative rule loading, matching, and action application.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::RuleLoadError;
use crate::event::{Channel, Decision, Event, EventType, ExplanationCode, PriorityHint};
use crate::history::HistoryStore;

#[derive(Debug, Clone, Deserialize)]
pub struct TimeWindow {
    #[serde(default)]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
}

fn default_end_hour() -> u32 {
    24
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchCondition {
    pub event_type: Option<HashSet<EventType>>,
    pub priority_hint: Option<HashSet<PriorityHint>>,
    pub channel: Option<HashSet<Channel>>,
    pub source: Option<HashSet<String>>,
    pub time_window: Option<TimeWindow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Action {
    pub force_decision: Option<Decision>,
    pub downgrade: Option<HashMap<String, Decision>>,
    pub limit_per_day: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "match", default)]
    pub match_condition: MatchCondition,
    #[serde(default)]
    pub action: Action,
}

impl Rule {
    fn matches(&self, event: &Event) -> bool {
        let cond = &self.match_condition;

        if let Some(types) = &cond.event_type {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        if let Some(hints) = &cond.priority_hint {
            match event.priority_hint {
                Some(hint) if hints.contains(&hint) => {}
                _ => return false,
            }
        }
        if let Some(channels) = &cond.channel {
            if !channels.contains(&event.channel) {
                return false;
            }
        }
        if let Some(sources) = &cond.source {
            if !sources.contains(&event.source) {
                return false;
            }
        }
        if let Some(tw) = &cond.time_window {
            let hour = event.timestamp.format("%H").to_string().parse::<u32>().unwrap_or(0);
            let in_window = if tw.start_hour > tw.end_hour {
                hour >= tw.start_hour || hour < tw.end_hour
            } else {
                hour >= tw.start_hour && hour < tw.end_hour
            };
            if !in_window {
                return false;
            }
        }

        true
    }
}

/// Outcome of applying a matched rule's actions against the classifier's decision.
pub struct RuleApplyResult {
    pub decision: Decision,
    pub explanation_code: Option<ExplanationCode>,
    pub matched_rule_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// Build a rule set from an already-deserialized list, sorted by
    /// priority descending (ties keep original order).
    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleSet { rules }
    }

    /// Parse a rules document, either a bare JSON array or `{"rules": [...]}`.
    pub fn from_json_str(document: &str) -> Result<Self, RuleLoadError> {
        let value: serde_json::Value = serde_json::from_str(document)?;
        let rules_value = match value {
            serde_json::Value::Array(_) => value,
            serde_json::Value::Object(mut map) => map
                .remove("rules")
                .unwrap_or(serde_json::Value::Array(Vec::new())),
            _ => serde_json::Value::Array(Vec::new()),
        };
        let rules: Vec<Rule> = serde_json::from_value(rules_value)?;
        Ok(Self::from_rules(rules))
    }

    /// Load rules from a JSON file on disk, failing with [`RuleLoadError`] if
    /// the file can't be read or parsed.
    pub fn load_file(path: &Path) -> Result<Self, RuleLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Load rules from a JSON file on disk. A missing file or invalid JSON is
    /// logged as a warning; the pipeline proceeds with an empty ruleset
    /// rather than failing the engine's construction.
    pub fn load_file_or_empty(path: &Path) -> Self {
        match Self::load_file(path) {
            Ok(rule_set) => rule_set,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not load rules document, proceeding with empty ruleset");
                RuleSet::empty()
            }
        }
    }

    /// All rules matching `event`, already sorted by priority descending.
    pub fn match_event(&self, event: &Event) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.matches(event)).collect()
    }

    /// Apply matched rules' actions in priority order, cumulatively.
    pub fn apply_actions(
        &self,
        event: &Event,
        matched: &[&Rule],
        current_decision: Decision,
        history: &HistoryStore,
        now: chrono::DateTime<chrono::Utc>,
    ) -> RuleApplyResult {
        let mut decision = current_decision;
        let mut explanation_code = None;
        let mut matched_rule_id = None;
        let mut reason = None;

        for rule in matched {
            let action = &rule.action;

            if let Some(forced) = action.force_decision {
                return RuleApplyResult {
                    decision: forced,
                    explanation_code: Some(ExplanationCode::RuleOverride),
                    matched_rule_id: Some(rule.id.clone()),
                    reason: Some(format!("Rule {}: {}", rule.id, rule.description)),
                };
            }

            if let Some(downgrade) = &action.downgrade {
                if let Some(&new_decision) = downgrade.get(decision.as_str()) {
                    reason = Some(format!(
                        "Rule {}: {} (downgraded {} -> {})",
                        rule.id,
                        rule.description,
                        decision.as_str(),
                        new_decision.as_str()
                    ));
                    decision = new_decision;
                    explanation_code = Some(ExplanationCode::RuleOverride);
                    matched_rule_id = Some(rule.id.clone());
                }
            }

            if let Some(limit) = action.limit_per_day {
                let count =
                    history.count_event_type_today(&event.user_id, now, event.event_type);
                if count as u32 >= limit {
                    return RuleApplyResult {
                        decision: Decision::Never,
                        explanation_code: Some(ExplanationCode::RuleOverride),
                        matched_rule_id: Some(rule.id.clone()),
                        reason: Some(format!(
                            "Rule {}: {} -- daily limit {} reached ({} today)",
                            rule.id, rule.description, limit, count
                        )),
                    };
                }
            }
        }

        RuleApplyResult {
            decision,
            explanation_code,
            matched_rule_id,
            reason,
        }
    }
}
