//! Clock abstraction for the limiter.

use chrono::Utc;

/// Source of the current time in milliseconds since the Unix epoch.
///
/// The limiter never reads wall-clock time directly; callers inject a
/// clock so window arithmetic stays deterministic under test.
pub trait Clock: Send + Sync {
    /// Current time as integer milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
