//! Exact dedupe-key matching and near-duplicate text similarity.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::event::{Event, ExplanationCode};
use crate::history::HistoryStore;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("hard-coded regular expression to be valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("hard-coded regular expression to be valid"));

/// Lowercase, NFKD-normalize, strip punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let decomposed: String = lowered.nfkd().collect();
    let stripped = NON_WORD.replace_all(&decomposed, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Normalized Levenshtein similarity ratio in `[0, 1]`.
///
/// `1.0` for identical strings, `0.0` if either is empty. A cheap
/// length-difference gate short-circuits the full distance computation when
/// the strings can't possibly meet `threshold`.
pub fn levenshtein_ratio(s1: &str, s2: &str, threshold: f64) -> f64 {
    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let len1 = s1.chars().count();
    let len2 = s2.chars().count();
    let max_len = len1.max(len2) as f64;

    if (len1 as f64 - len2 as f64).abs() / max_len > (1.0 - threshold) {
        return 0.0;
    }

    let distance = strsim::levenshtein(s1, s2) as f64;
    1.0 - (distance / max_len)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOutcome {
    NotDuplicate,
    Duplicate {
        explanation_code: ExplanationCode,
        matched_event_id: String,
    },
}

pub struct DuplicateDetector {
    dedupe_window_minutes: i64,
    similarity_threshold: f64,
}

impl DuplicateDetector {
    pub fn new(dedupe_window_minutes: i64, similarity_threshold: f64) -> Self {
        DuplicateDetector {
            dedupe_window_minutes,
            similarity_threshold,
        }
    }

    /// Check `event` against `history` for an exact dedupe-key hit or a
    /// near-duplicate text match, in that order.
    pub fn check(&self, event: &Event, history: &HistoryStore, now: DateTime<Utc>) -> DuplicateOutcome {
        if let Some(key) = event.dedupe_key.as_deref() {
            let matches =
                history.get_dedupe_key_entries(&event.user_id, now, key, self.dedupe_window_minutes);
            if let Some(most_recent) = matches.last() {
                return DuplicateOutcome::Duplicate {
                    explanation_code: ExplanationCode::DuplicateDedupeKey,
                    matched_event_id: most_recent.event_id.clone(),
                };
            }
        }

        let candidate_text = normalize_text(event.combined_text().trim());
        if !candidate_text.is_empty() {
            let past_entries =
                history.get_text_entries(&event.user_id, now, self.dedupe_window_minutes);
            for entry in past_entries {
                let ratio =
                    levenshtein_ratio(&candidate_text, &entry.normalized_text, self.similarity_threshold);
                if ratio >= self.similarity_threshold {
                    return DuplicateOutcome::Duplicate {
                        explanation_code: ExplanationCode::DuplicateTextSimilar,
                        matched_event_id: entry.event_id.clone(),
                    };
                }
            }
        }

        DuplicateOutcome::NotDuplicate
    }
}
