//! Error types for the fallible boundaries of the pipeline.
//!
//! The decision engine itself never returns an `Err` from `process_event` —
//! validation failures and rule-load failures are caught internally and
//! turned into decisions or warnings per the pipeline's error taxonomy.
//! These types exist for the inner boundaries that produce them.

use thiserror::Error;

/// Why a raw event was rejected before it became a canonical [`crate::event::Event`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid event_type '{0}'")]
    InvalidEventType(String),

    #[error("invalid channel '{0}'")]
    InvalidChannel(String),

    #[error("invalid priority_hint '{0}'")]
    InvalidPriorityHint(String),

    #[error("invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    #[error("invalid expires_at format: {0}")]
    InvalidExpiresAt(String),

    #[error("event must be a JSON object")]
    NotAnObject,
}

/// Why a rules document failed to load. Never propagated past [`crate::rules::RuleSet`] —
/// the engine logs it and falls back to an empty ruleset.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("could not read rules file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse rules document: {0}")]
    Parse(#[from] serde_json::Error),
}
