//! The per-read injection entry points used by the shims.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use openstride_config::InputMode;
use openstride_state::{MotionCounters, TreadmillState};

use crate::blend::{ACTIVE_THRESHOLD, Blendable, Sample, Vec2, blend_decision};
use crate::classify::FloatAxis;
use crate::controller::ControllerFilter;

/// Every Nth injection is logged at debug level.
pub const INJECTION_LOG_INTERVAL: u64 = 500;

/// Whether live treadmill data is available.
pub trait MotionLink: Send + Sync {
    /// `true` while samples are arriving.
    fn is_connected(&self) -> bool;
}

impl MotionLink for AtomicBool {
    fn is_connected(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<F: Fn() -> bool + Send + Sync> MotionLink for F {
    fn is_connected(&self) -> bool {
        self()
    }
}

/// Applies the configured blend to host input values.
pub struct Injector {
    mode: InputMode,
    threshold: f32,
    state: Arc<TreadmillState>,
    counters: Arc<MotionCounters>,
    link: Arc<dyn MotionLink>,
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("mode", &self.mode)
            .field("threshold", &self.threshold)
            .field("connected", &self.link.is_connected())
            .finish()
    }
}

impl Injector {
    /// Injector with the standard activity threshold.
    pub fn new(
        mode: InputMode,
        state: Arc<TreadmillState>,
        counters: Arc<MotionCounters>,
        link: Arc<dyn MotionLink>,
    ) -> Self {
        Self {
            mode,
            threshold: ACTIVE_THRESHOLD,
            state,
            counters,
            link,
        }
    }

    /// Override the activity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Blend mode.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Whether live data is available.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Single-axis action. `None` means leave the host value alone.
    #[inline]
    pub fn inject_float(&self, prior: Sample<f32>, axis: FloatAxis) -> Option<Sample<f32>> {
        if !self.is_connected() {
            return self.pass_through();
        }
        let treadmill = match axis {
            FloatAxis::X => self.state.x(),
            FloatAxis::Y => self.state.y(),
        };
        self.apply(prior, treadmill)
    }

    /// Two-axis action.
    #[inline]
    pub fn inject_vector(&self, prior: Sample<Vec2>) -> Option<Sample<Vec2>> {
        if !self.is_connected() {
            return self.pass_through();
        }
        let treadmill = Vec2::new(self.state.x(), self.state.y());
        self.apply(prior, treadmill)
    }

    /// Legacy joystick of controller `slot`, subject to `filter`.
    #[inline]
    pub fn inject_joystick(
        &self,
        slot: u32,
        prior: Sample<Vec2>,
        filter: &ControllerFilter,
    ) -> Option<Sample<Vec2>> {
        if !filter.accepts(slot) {
            return None;
        }
        self.inject_vector(prior)
    }

    fn apply<T: Blendable + fmt::Debug>(&self, prior: Sample<T>, treadmill: T) -> Option<Sample<T>> {
        match blend_decision(prior, treadmill, self.mode, self.threshold) {
            Some(blended) => {
                let injected = self.counters.inc_injection();
                if injected.is_multiple_of(INJECTION_LOG_INTERVAL) {
                    tracing::debug!(value = ?blended.value, injected, "Injected treadmill motion");
                }
                Some(blended)
            }
            None => self.pass_through(),
        }
    }

    fn pass_through<T>(&self) -> Option<T> {
        self.counters.inc_passthrough();
        None
    }
}
