//! The shared treadmill motion state.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use openstride_filters::MotionSample;

/// Point-in-time copy of [`TreadmillState`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSnapshot {
    /// Lateral displacement in `[-1, 1]`.
    pub x: f32,
    /// Forward displacement in `[-1, 1]`.
    pub y: f32,
    /// Heading in `[0, 360)`.
    pub yaw: f32,
    /// Set once any sample has been published.
    pub active: bool,
    /// Monotonic milliseconds of the last publish.
    pub last_update_ms: u64,
    /// Number of publishes since construction or reset.
    pub update_count: u64,
}

impl MotionSnapshot {
    /// The motion part of the snapshot.
    #[must_use]
    pub const fn sample(&self) -> MotionSample {
        MotionSample::new(self.x, self.y, self.yaw)
    }

    /// Whether the last publish happened less than `threshold_ms` before `now_ms`.
    #[must_use]
    pub const fn is_fresh(&self, now_ms: u64, threshold_ms: u64) -> bool {
        self.active && now_ms.saturating_sub(self.last_update_ms) < threshold_ms
    }
}

/// Lock-free treadmill state.
///
/// Floats are stored as their bit patterns in `AtomicU32`. The update counter
/// is written last with `Release` so a reader that sees a new count also sees
/// the fields written before it.
///
/// # Example
///
/// ```rust
/// use openstride_state::{MotionSample, TreadmillState};
///
/// static STATE: TreadmillState = TreadmillState::new();
///
/// STATE.publish(MotionSample::new(0.5, 0.0, 10.0), 42);
/// assert!((STATE.x() - 0.5).abs() < f32::EPSILON);
/// assert_eq!(STATE.last_update_ms(), 42);
/// ```
#[derive(Debug)]
pub struct TreadmillState {
    x: AtomicU32,
    y: AtomicU32,
    yaw: AtomicU32,
    active: AtomicBool,
    last_update_ms: AtomicU64,
    update_count: AtomicU64,
}

impl Default for TreadmillState {
    fn default() -> Self {
        Self::new()
    }
}

impl TreadmillState {
    /// Zero-initialized, inactive state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            x: AtomicU32::new(0),
            y: AtomicU32::new(0),
            yaw: AtomicU32::new(0),
            active: AtomicBool::new(false),
            last_update_ms: AtomicU64::new(0),
            update_count: AtomicU64::new(0),
        }
    }

    /// Overwrite the state with a new sample and return the new update count.
    ///
    /// # RT Safety
    ///
    /// Six atomic stores and one fetch-add; never blocks.
    #[inline]
    pub fn publish(&self, sample: MotionSample, now_ms: u64) -> u64 {
        self.x.store(sample.x.to_bits(), Ordering::Relaxed);
        self.y.store(sample.y.to_bits(), Ordering::Relaxed);
        self.yaw.store(sample.yaw.to_bits(), Ordering::Relaxed);
        self.last_update_ms.store(now_ms, Ordering::Relaxed);
        self.active.store(true, Ordering::Relaxed);
        self.update_count
            .fetch_add(1, Ordering::Release)
            .wrapping_add(1)
    }

    /// Current lateral displacement.
    #[inline]
    #[must_use]
    pub fn x(&self) -> f32 {
        f32::from_bits(self.x.load(Ordering::Relaxed))
    }

    /// Current forward displacement.
    #[inline]
    #[must_use]
    pub fn y(&self) -> f32 {
        f32::from_bits(self.y.load(Ordering::Relaxed))
    }

    /// Current heading.
    #[inline]
    #[must_use]
    pub fn yaw(&self) -> f32 {
        f32::from_bits(self.yaw.load(Ordering::Relaxed))
    }

    /// Whether any sample has been published.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Monotonic milliseconds of the last publish.
    #[inline]
    #[must_use]
    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms.load(Ordering::Relaxed)
    }

    /// Number of publishes.
    #[inline]
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Acquire)
    }

    /// Read every field.
    #[must_use]
    pub fn snapshot(&self) -> MotionSnapshot {
        let update_count = self.update_count();
        MotionSnapshot {
            x: self.x(),
            y: self.y(),
            yaw: self.yaw(),
            active: self.is_active(),
            last_update_ms: self.last_update_ms(),
            update_count,
        }
    }

    /// Return to the zero-initialized state.
    pub fn reset(&self) {
        self.x.store(0, Ordering::Relaxed);
        self.y.store(0, Ordering::Relaxed);
        self.yaw.store(0, Ordering::Relaxed);
        self.active.store(false, Ordering::Relaxed);
        self.last_update_ms.store(0, Ordering::Relaxed);
        self.update_count.store(0, Ordering::Release);
    }
}
