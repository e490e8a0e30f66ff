use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Clock
///
/// The source of "now" for every time-dependent decision (release dates, unlock
/// delays, default release dates). Handlers never call `Utc::now()` directly, so
/// tests can pin the time with `FixedClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// ClockState
///
/// The concrete type used to share the clock across the application state.
pub type ClockState = Arc<dyn Clock>;
