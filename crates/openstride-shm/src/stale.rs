//! Consecutive stale-read counting.

/// Consecutive stale reads before a consumer checks whether the master died.
pub const STALE_COUNT_THRESHOLD: u32 = 10;

/// Counts consecutive stale or failed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTracker {
    threshold: u32,
    consecutive: u32,
}

impl Default for StaleTracker {
    fn default() -> Self {
        Self::new(STALE_COUNT_THRESHOLD)
    }
}

impl StaleTracker {
    /// Tracker that fires after `threshold` stale reads. `0` is treated as `1`.
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold: if threshold == 0 { 1 } else { threshold },
            consecutive: 0,
        }
    }

    /// Record a fresh read.
    pub fn record_fresh(&mut self) {
        self.consecutive = 0;
    }

    /// Record a stale read. Returns `true` exactly once per run, on the read
    /// that reaches the threshold.
    pub fn record_stale(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive == self.threshold
    }

    /// Start counting again, e.g. after the master was found alive.
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Current run length.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_at_threshold() {
        let mut tracker = StaleTracker::default();
        let fired: Vec<bool> = (0..25).map(|_| tracker.record_stale()).collect();

        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert!(fired[9]);
    }

    #[test]
    fn test_fresh_read_restarts_run() {
        let mut tracker = StaleTracker::new(3);
        assert!(!tracker.record_stale());
        assert!(!tracker.record_stale());
        tracker.record_fresh();
        assert!(!tracker.record_stale());
        assert!(!tracker.record_stale());
        assert!(tracker.record_stale());
    }

    #[test]
    fn test_reset_rearms() {
        let mut tracker = StaleTracker::new(2);
        tracker.record_stale();
        assert!(tracker.record_stale());
        tracker.reset();
        assert_eq!(tracker.consecutive(), 0);
        tracker.record_stale();
        assert!(tracker.record_stale());
    }

    #[test]
    fn test_zero_threshold_fires_immediately() {
        let mut tracker = StaleTracker::new(0);
        assert!(tracker.record_stale());
    }
}
