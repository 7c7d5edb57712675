//! Injectable wall-clock, so that history windowing and scheduling are
//! reproducible in tests without depending on real elapsed time.

use chrono::{DateTime, Utc};

/// Supplies "now" to the history store and scheduler.
///
/// The pipeline deliberately measures recency against wall-clock time, not
/// the event's own timestamp (see the Decision Engine's Design Notes) — this
/// trait is the seam that makes that coupling testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: delegates to [`chrono::Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
