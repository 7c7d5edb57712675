//! Notification decision pipeline: turns incoming events into NOW/LATER/NEVER
//! delivery decisions, with dedup, rule overrides, keyword classification,
//! frequency/noise damping, and scheduling.

pub mod classifier;
pub mod clock;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod logging;
pub mod rules;
pub mod scheduler;
pub mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::DecisionEngine;
pub use error::{RuleLoadError, ValidationError};
pub use event::{
    Channel, Decision, Event, EventType, ExplanationCode, PriorityHint, RawEvent,
};
pub use rules::RuleSet;
