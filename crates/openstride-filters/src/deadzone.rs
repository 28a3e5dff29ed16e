//! Deadzone and range helpers
//!
//! The deadzone forces small magnitudes to zero and rescales what remains so
//! the output is continuous at the boundary and still reaches full scale.

/// Centre value of a vendor gamepad byte.
pub const GAMEPAD_CENTER: i32 = 127;

/// Apply a rescaling deadzone.
///
/// Values with `|value| < deadzone` become `0.0`. Everything else is mapped
/// from `[deadzone, 1]` back onto `[0, 1]` keeping the sign, so
/// `apply_deadzone(deadzone, deadzone) == 0.0` and `apply_deadzone(1.0, deadzone) == 1.0`.
///
/// A negative or non-finite deadzone is treated as no deadzone; a deadzone of
/// `1.0` or more swallows every input. Non-finite values yield `0.0`.
///
/// # Example
///
/// ```
/// use openstride_filters::apply_deadzone;
///
/// assert_eq!(apply_deadzone(0.05, 0.1), 0.0);
/// assert!((apply_deadzone(0.55, 0.1) - 0.5).abs() < 1e-6);
/// assert!((apply_deadzone(-1.0, 0.1) + 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let deadzone = if deadzone.is_finite() {
        deadzone.max(0.0)
    } else {
        0.0
    };
    if deadzone >= 1.0 {
        return 0.0;
    }

    let magnitude = value.abs();
    if magnitude < deadzone {
        return 0.0;
    }
    let scaled = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
    scaled.copysign(value)
}

/// Clamp to `[-1, 1]`; non-finite input yields `0.0`.
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Map a vendor gamepad byte (`0..=255`, centre 127) onto `[-1, 1]`.
///
/// `invert` flips the sign; the forward axis is reported inverted by the
/// hardware, so callers pass `true` for Y.
#[inline]
pub fn normalize_gamepad_axis(raw: i32, invert: bool) -> f32 {
    let centred = raw.saturating_sub(GAMEPAD_CENTER) as f32 / GAMEPAD_CENTER as f32;
    let value = if invert { -centred } else { centred };
    clamp_unit(value)
}
