//! Time source for relation timestamps.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of `created_at` values. Timestamps are microsecond precision so they survive
/// storage and cursor round-trips unchanged.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_micros(Utc::now())
    }
}

/// Deterministic clock: every call returns the current instant, then advances by `step`.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
    step_micros: i64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            micros: AtomicI64::new(start.timestamp_micros()),
            step_micros: step.num_microseconds().unwrap_or(0),
        }
    }

    /// Starts at 2024-01-01T00:00:00Z and advances one second per call.
    pub fn stepping() -> Self {
        let start = DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default();
        Self::new(start, chrono::Duration::seconds(1))
    }

    /// Returns the same instant on every call.
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::new(at, chrono::Duration::zero())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let micros = self.micros.fetch_add(self.step_micros, Ordering::SeqCst);
        DateTime::from_timestamp_micros(micros).unwrap_or_default()
    }
}

/// Drop sub-microsecond precision.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}
