//! Time sources.
//!
//! In-process freshness uses a monotonic clock; the shared-memory record uses
//! wall-clock milliseconds because its writer lives in another process.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since construction, saturating at `u64::MAX`.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Wall-clock milliseconds since the Unix epoch; `0` if the clock is before it.
#[must_use]
pub fn unix_time_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_decreases() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_unix_time_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(unix_time_ms() > 1_577_836_800_000);
    }
}
