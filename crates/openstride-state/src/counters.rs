//! Diagnostic counters for the motion pipeline.
//!
//! Every method is a single relaxed atomic operation, so the bridge callback
//! and host threads can count without coordination.

use core::sync::atomic::{AtomicU64, Ordering};

/// Counter snapshot returned by [`MotionCounters::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Raw samples delivered by the hardware bridge
    pub samples_received: u64,
    /// Host calls whose output was replaced or blended
    pub injections: u64,
    /// Host calls left untouched
    pub passthroughs: u64,
    /// Shared-memory reads that were stale or failed
    pub stale_reads: u64,
    /// Consumer to master promotions
    pub failovers: u64,
}

/// Atomic counters for the motion pipeline.
///
/// # Example
///
/// ```rust
/// use openstride_state::MotionCounters;
///
/// let counters = MotionCounters::new();
/// counters.inc_sample();
/// counters.inc_injection();
///
/// let snapshot = counters.snapshot();
/// assert_eq!(snapshot.samples_received, 1);
/// assert_eq!(snapshot.injections, 1);
/// ```
#[derive(Debug)]
pub struct MotionCounters {
    samples_received: AtomicU64,
    injections: AtomicU64,
    passthroughs: AtomicU64,
    stale_reads: AtomicU64,
    failovers: AtomicU64,
}

impl Default for MotionCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionCounters {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples_received: AtomicU64::new(0),
            injections: AtomicU64::new(0),
            passthroughs: AtomicU64::new(0),
            stale_reads: AtomicU64::new(0),
            failovers: AtomicU64::new(0),
        }
    }

    /// Count one bridge sample and return the new total.
    #[inline]
    pub fn inc_sample(&self) -> u64 {
        self.samples_received
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// Count one injected host call and return the new total.
    #[inline]
    pub fn inc_injection(&self) -> u64 {
        self.injections
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// Count one untouched host call.
    #[inline]
    pub fn inc_passthrough(&self) {
        self.passthroughs.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one stale or failed shared-memory read.
    #[inline]
    pub fn inc_stale_read(&self) {
        self.stale_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one promotion to master.
    #[inline]
    pub fn inc_failover(&self) {
        self.failovers.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters without resetting them.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            injections: self.injections.load(Ordering::Relaxed),
            passthroughs: self.passthroughs.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
            failovers: self.failovers.load(Ordering::Relaxed),
        }
    }

    /// Read all counters and zero them.
    pub fn snapshot_and_reset(&self) -> CounterSnapshot {
        CounterSnapshot {
            samples_received: self.samples_received.swap(0, Ordering::Relaxed),
            injections: self.injections.swap(0, Ordering::Relaxed),
            passthroughs: self.passthroughs.swap(0, Ordering::Relaxed),
            stale_reads: self.stale_reads.swap(0, Ordering::Relaxed),
            failovers: self.failovers.swap(0, Ordering::Relaxed),
        }
    }
}
