//! Per-sample conditioning and publication.

use std::sync::Arc;

use openstride_filters::{ConditionerState, MotionSample, RawSample, condition_filter, condition_raw_axes};
use openstride_state::{MonotonicClock, MotionCounters, TreadmillState};

use crate::native::SampleSink;

/// Every Nth received sample is logged at debug level.
pub const SAMPLE_LOG_INTERVAL: u64 = 100;

/// Conditions raw samples and publishes them to the shared treadmill state.
///
/// Filter history is read back from the published state rather than kept
/// here, so `process` takes `&self` and never locks. The vendor delivers
/// samples from a single thread; concurrent callers would interleave their
/// smoothing history but never tear a value.
#[derive(Debug)]
pub struct SampleProcessor {
    params: ConditionerState,
    state: Arc<TreadmillState>,
    counters: Arc<MotionCounters>,
    clock: MonotonicClock,
}

impl SampleProcessor {
    /// Create a processor with its own clock.
    pub fn new(
        params: ConditionerState,
        state: Arc<TreadmillState>,
        counters: Arc<MotionCounters>,
    ) -> Self {
        Self::with_clock(params, state, counters, MonotonicClock::new())
    }

    /// Create a processor stamping updates with `clock`.
    ///
    /// Readers judge freshness against the same clock, so share it.
    pub fn with_clock(
        params: ConditionerState,
        state: Arc<TreadmillState>,
        counters: Arc<MotionCounters>,
        clock: MonotonicClock,
    ) -> Self {
        Self {
            params,
            state,
            counters,
            clock,
        }
    }

    /// The state this processor publishes to.
    pub fn state(&self) -> &Arc<TreadmillState> {
        &self.state
    }

    /// The clock used for update timestamps.
    pub fn clock(&self) -> MonotonicClock {
        self.clock
    }

    /// Condition `raw` against the last published sample and publish the result.
    pub fn process(&self, raw: RawSample) -> MotionSample {
        let last = self.state.snapshot();
        let mut conditioner = self.params;
        conditioner.prev = last.sample();
        conditioner.primed = last.active;

        let sample = condition_filter(raw, &mut conditioner);
        self.publish(sample)
    }

    /// Publish a sample received from another process.
    ///
    /// Displacement is re-derived from the raw bytes with local settings and
    /// is not smoothed; the heading is taken as already conditioned.
    pub fn ingest_remote(&self, gamepad_x: i32, gamepad_y: i32, yaw: f32) -> MotionSample {
        let (x, y) = condition_raw_axes(gamepad_x, gamepad_y, &self.params);
        self.publish(MotionSample::new(x, y, yaw))
    }

    fn publish(&self, sample: MotionSample) -> MotionSample {
        self.state.publish(sample, self.clock.now_ms());
        let received = self.counters.inc_sample();
        if received.is_multiple_of(SAMPLE_LOG_INTERVAL) {
            tracing::debug!(
                x = sample.x,
                y = sample.y,
                yaw = sample.yaw,
                received,
                "Treadmill sample"
            );
        }
        sample
    }
}

impl SampleSink for SampleProcessor {
    fn on_sample(&self, sample: RawSample) {
        self.process(sample);
    }
}
