//! Per-sample conditioning chain
//!
//! Raw vendor readings go through normalize, deadzone, speed scaling, clamp
//! and EMA, in that order. Heading uses circular smoothing.

use crate::deadzone::{apply_deadzone, clamp_unit, normalize_gamepad_axis};
use crate::smoothing::{apply_smoothing, normalize_yaw, smooth_yaw};

/// One reading as delivered by the vendor decoder.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RawSample {
    /// Absolute ring heading in degrees.
    pub ring_angle: f32,
    /// Lateral gamepad byte, centre 127.
    pub gamepad_x: i32,
    /// Forward gamepad byte, centre 127, inverted by the hardware.
    pub gamepad_y: i32,
}

impl RawSample {
    /// Create a raw sample.
    pub const fn new(ring_angle: f32, gamepad_x: i32, gamepad_y: i32) -> Self {
        Self {
            ring_angle,
            gamepad_x,
            gamepad_y,
        }
    }
}

/// Conditioned motion: `x`/`y` in `[-1, 1]`, `yaw` in `[0, 360)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MotionSample {
    /// Lateral displacement.
    pub x: f32,
    /// Forward displacement.
    pub y: f32,
    /// Heading in degrees.
    pub yaw: f32,
}

impl MotionSample {
    /// Create a motion sample.
    pub const fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self { x, y, yaw }
    }
}

/// Parameters and history of the conditioning chain.
///
/// # RT Safety
///
/// - `#[repr(C)]` for stable ABI
/// - No heap allocations
/// - O(1) time complexity
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct ConditionerState {
    /// Deadzone in `[0, 1)`.
    pub deadzone: f32,
    /// Displacement scale applied after the deadzone.
    pub speed_multiplier: f32,
    /// EMA coefficient in `(0, 1]`; `1.0` disables smoothing.
    pub smoothing: f32,
    /// Last emitted sample.
    pub prev: MotionSample,
    /// Whether `prev` holds a real sample.
    pub primed: bool,
}

impl ConditionerState {
    /// Create a conditioner with the given parameters and zeroed history.
    ///
    /// # Example
    ///
    /// ```
    /// use openstride_filters::ConditionerState;
    ///
    /// let state = ConditionerState::new(0.1, 1.5, 0.3);
    /// assert!(!state.primed);
    /// ```
    pub const fn new(deadzone: f32, speed_multiplier: f32, smoothing: f32) -> Self {
        Self {
            deadzone,
            speed_multiplier,
            smoothing,
            prev: MotionSample::new(0.0, 0.0, 0.0),
            primed: false,
        }
    }

    /// No deadzone, unit speed, no smoothing.
    pub const fn passthrough() -> Self {
        Self::new(0.0, 1.0, 1.0)
    }
}

impl Default for ConditionerState {
    fn default() -> Self {
        Self::new(0.1, 1.5, 0.3)
    }
}

/// Derive `x`/`y` from raw gamepad bytes without smoothing.
///
/// Shared-memory consumers use this on the master's raw values so that their
/// own deadzone and speed settings apply.
#[inline]
pub fn condition_raw_axes(gamepad_x: i32, gamepad_y: i32, state: &ConditionerState) -> (f32, f32) {
    let shape = |raw: i32, invert: bool| {
        let value = normalize_gamepad_axis(raw, invert);
        let value = apply_deadzone(value, state.deadzone);
        clamp_unit(value * state.speed_multiplier)
    };
    (shape(gamepad_x, false), shape(gamepad_y, true))
}

/// Run one raw sample through the full chain and remember the result.
///
/// The first sample takes its heading directly; later samples smooth it on
/// the circle. Displacement is always smoothed against the previous output,
/// which starts at zero.
///
/// # Example
///
/// ```
/// use openstride_filters::prelude::*;
///
/// let mut state = ConditionerState::new(0.0, 1.0, 0.5);
/// let first = condition_filter(RawSample::new(10.0, 254, 127), &mut state);
/// assert!((first.x - 0.5).abs() < 1e-6);
/// assert!((first.yaw - 10.0).abs() < 1e-6);
/// ```
#[inline]
pub fn condition_filter(raw: RawSample, state: &mut ConditionerState) -> MotionSample {
    let (target_x, target_y) = condition_raw_axes(raw.gamepad_x, raw.gamepad_y, state);

    let x = clamp_unit(apply_smoothing(state.prev.x, target_x, state.smoothing));
    let y = clamp_unit(apply_smoothing(state.prev.y, target_y, state.smoothing));
    let yaw = if state.primed {
        smooth_yaw(state.prev.yaw, raw.ring_angle, state.smoothing)
    } else {
        normalize_yaw(raw.ring_angle)
    };

    let sample = MotionSample::new(x, y, yaw);
    state.prev = sample;
    state.primed = true;
    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_bytes_are_rest() {
        let mut state = ConditionerState::default();
        let sample = condition_filter(RawSample::new(0.0, 127, 127), &mut state);
        assert_eq!(sample.x, 0.0);
        assert_eq!(sample.y, 0.0);
    }

    #[test]
    fn test_forward_axis_is_inverted() {
        let mut state = ConditionerState::passthrough();
        let sample = condition_filter(RawSample::new(0.0, 127, 0), &mut state);
        assert!((sample.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_then_clamp() {
        let state = ConditionerState::new(0.0, 4.0, 1.0);
        let (x, y) = condition_raw_axes(190, 64, &state);
        assert_eq!(x, 1.0);
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_history_drives_ema() {
        let mut state = ConditionerState::new(0.0, 1.0, 0.5);
        let first = condition_filter(RawSample::new(0.0, 254, 127), &mut state);
        let second = condition_filter(RawSample::new(0.0, 254, 127), &mut state);
        assert!((first.x - 0.5).abs() < 1e-6);
        assert!((second.x - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_heading_smoothed_after_first_sample() {
        let mut state = ConditionerState::new(0.0, 1.0, 0.5);
        condition_filter(RawSample::new(350.0, 127, 127), &mut state);
        let next = condition_filter(RawSample::new(10.0, 127, 127), &mut state);
        assert!(next.yaw.abs() < 1e-3 || (next.yaw - 360.0).abs() < 1e-3);
    }
}
