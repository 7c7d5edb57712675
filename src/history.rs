//! Per-user bounded ring of recent decisions, with time-windowed queries.
//!
//! `HistoryStore` itself is not internally synchronized — per the pipeline's
//! concurrency model, the [`crate::engine::DecisionEngine`] is the single
//! owner and guards it behind one lock per `process_event` call.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::event::{Decision, EventType, HistoryRecord};

pub struct HistoryStore {
    buffer_size: usize,
    by_user: HashMap<String, VecDeque<HistoryRecord>>,
}

impl HistoryStore {
    pub fn new(buffer_size: usize) -> Self {
        HistoryStore {
            buffer_size,
            by_user: HashMap::new(),
        }
    }

    /// Append a decision record for a user, evicting the oldest if the ring is full.
    pub fn add(&mut self, user_id: &str, record: HistoryRecord) {
        let ring = self
            .by_user
            .entry(user_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.buffer_size));
        if ring.len() >= self.buffer_size {
            ring.pop_front();
        }
        ring.push_back(record);
    }

    /// All records for a user, optionally restricted to those with
    /// `timestamp >= now - window`. The window cutoff is inclusive.
    pub fn get_recent(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window_minutes: Option<i64>,
    ) -> Vec<&HistoryRecord> {
        let records = self.by_user.get(user_id);
        match (records, window_minutes) {
            (None, _) => Vec::new(),
            (Some(records), None) => records.iter().collect(),
            (Some(records), Some(minutes)) => {
                let cutoff = now - Duration::minutes(minutes);
                records.iter().filter(|r| r.timestamp >= cutoff).collect()
            }
        }
    }

    pub fn count_in_window(&self, user_id: &str, now: DateTime<Utc>, window_minutes: i64) -> usize {
        self.get_recent(user_id, now, Some(window_minutes)).len()
    }

    pub fn count_decisions_by_type(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        event_type: EventType,
        decision: Decision,
        window_minutes: i64,
    ) -> usize {
        self.get_recent(user_id, now, Some(window_minutes))
            .into_iter()
            .filter(|r| r.event_type == event_type && r.decision == decision)
            .count()
    }

    pub fn count_by_event_type(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        event_type: EventType,
        window_minutes: i64,
    ) -> usize {
        self.get_recent(user_id, now, Some(window_minutes))
            .into_iter()
            .filter(|r| r.event_type == event_type)
            .count()
    }

    /// Count `NOW` decisions in the window whose event_type or source matches.
    pub fn count_urgent_by_source_or_type(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        event_type: EventType,
        source: &str,
        window_minutes: i64,
    ) -> usize {
        self.get_recent(user_id, now, Some(window_minutes))
            .into_iter()
            .filter(|r| {
                r.decision == Decision::Now && (r.event_type == event_type || r.source == source)
            })
            .count()
    }

    pub fn get_dedupe_key_entries(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        key: &str,
        window_minutes: i64,
    ) -> Vec<&HistoryRecord> {
        self.get_recent(user_id, now, Some(window_minutes))
            .into_iter()
            .filter(|r| r.dedupe_key.as_deref() == Some(key))
            .collect()
    }

    pub fn get_text_entries(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window_minutes: i64,
    ) -> Vec<&HistoryRecord> {
        self.get_recent(user_id, now, Some(window_minutes))
            .into_iter()
            .filter(|r| !r.normalized_text.is_empty())
            .collect()
    }

    /// Count events of `event_type` whose timestamp falls on today's UTC date.
    pub fn count_event_type_today(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        event_type: EventType,
    ) -> usize {
        let today = now.date_naive();
        match self.by_user.get(user_id) {
            None => 0,
            Some(records) => records
                .iter()
                .filter(|r| r.event_type == event_type && r.timestamp.date_naive() == today)
                .count(),
        }
    }

    pub fn clear(&mut self) {
        self.by_user.clear();
    }

    pub fn clear_user(&mut self, user_id: &str) {
        self.by_user.remove(user_id);
    }
}
