//! Domain primitives: TimeMs, Clock, direction labels.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Add a duration in milliseconds, saturating on overflow.
    pub fn plus_ms(&self, ms: i64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of "now" for overlay expiry.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> TimeMs;
}

/// Monotonic clock reporting epoch milliseconds.
///
/// Reads the wall clock once at construction and advances with a monotonic
/// instant afterwards, so wall-clock steps cannot stretch or cut overlay windows.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor: TimeMs,
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: TimeMs::now(),
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> TimeMs {
        let elapsed = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor.plus_ms(elapsed)
    }
}

/// Manually driven clock, shared between a test and the code under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start: TimeMs) -> Self {
        ManualClock(Arc::new(AtomicI64::new(start.as_ms())))
    }

    pub fn set(&self, at: TimeMs) {
        self.0.store(at.as_ms(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimeMs {
        TimeMs(self.0.load(Ordering::SeqCst))
    }
}

/// "Long" or "Short", as used in user-facing messages.
pub fn direction_label(is_long: bool) -> &'static str {
    if is_long {
        "Long"
    } else {
        "Short"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
        assert_eq!(t1.plus_ms(1000), t2);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(TimeMs::new(5_000));
        let other = clock.clone();
        clock.advance_ms(250);
        assert_eq!(other.now(), TimeMs::new(5_250));
        other.set(TimeMs::new(1));
        assert_eq!(clock.now(), TimeMs::new(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_monotonic_time() {
        let clock = SystemClock::new();
        let start = clock.now();
        assert!((start.as_ms() - TimeMs::now().as_ms()).abs() < 60_000);

        tokio::time::advance(std::time::Duration::from_millis(1_500)).await;
        assert_eq!(clock.now(), start.plus_ms(1_500));
    }

    #[test]
    fn test_direction_label() {
        assert_eq!(direction_label(true), "Long");
        assert_eq!(direction_label(false), "Short");
    }
}
