//! Exponential smoothing
//!
//! Linear EMA for the displacement axes and a circular variant for the ring
//! heading.

/// Degrees in a full turn.
pub const FULL_TURN_DEG: f32 = 360.0;

/// Single-pole EMA step: `current + (target - current) * factor`.
///
/// `factor` is clamped to `[0, 1]`. `factor >= 1` returns `target` exactly and
/// `factor <= 0` returns `current` exactly, so the two ends are not subject to
/// rounding.
///
/// # Example
///
/// ```
/// use openstride_filters::apply_smoothing;
///
/// assert_eq!(apply_smoothing(0.1, 0.3, 1.0), 0.3);
/// assert_eq!(apply_smoothing(0.1, 0.3, 0.0), 0.1);
/// assert!((apply_smoothing(0.0, 1.0, 0.25) - 0.25).abs() < 1e-6);
/// ```
#[inline]
pub fn apply_smoothing(current: f32, target: f32, factor: f32) -> f32 {
    if factor.is_nan() || factor <= 0.0 {
        return current;
    }
    if factor >= 1.0 {
        return target;
    }
    current + (target - current) * factor
}

/// Wrap any finite angle into `[0, 360)`. Non-finite input yields `0.0`.
#[inline]
pub fn normalize_yaw(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(FULL_TURN_DEG);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= FULL_TURN_DEG {
        0.0
    } else {
        wrapped
    }
}

/// EMA on the heading circle.
///
/// The shortest signed difference is taken (wrapped once into `[-180, 180)`),
/// scaled by `factor` and added to `current`; the result is renormalized into
/// `[0, 360)`. A single step therefore never moves further than
/// `factor * 180°`.
///
/// # Example
///
/// ```
/// use openstride_filters::smooth_yaw;
///
/// // Crossing north moves forward, not back around the circle.
/// let yaw = smooth_yaw(359.0, 2.0, 0.5);
/// assert!((yaw - 0.5).abs() < 1e-4);
/// ```
#[inline]
pub fn smooth_yaw(current: f32, target: f32, factor: f32) -> f32 {
    let current = normalize_yaw(current);
    let target = normalize_yaw(target);
    let factor = if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    };

    let mut diff = target - current;
    if diff >= 180.0 {
        diff -= FULL_TURN_DEG;
    } else if diff < -180.0 {
        diff += FULL_TURN_DEG;
    }

    normalize_yaw(current + factor * diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_converges() {
        let mut value = 0.0;
        for _ in 0..200 {
            value = apply_smoothing(value, 1.0, 0.3);
        }
        assert!((value - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_nan_factor_freezes() {
        assert_eq!(apply_smoothing(0.4, 1.0, f32::NAN), 0.4);
    }

    #[test]
    fn test_yaw_wraps_backwards() {
        let yaw = smooth_yaw(1.0, 358.0, 0.5);
        assert!((yaw - 359.5).abs() < 1e-4, "got {yaw}");
    }

    #[test]
    fn test_yaw_opposite_side() {
        // Exactly 180 apart wraps to -180 and turns the negative way.
        let yaw = smooth_yaw(10.0, 190.0, 0.5);
        assert!((yaw - 280.0).abs() < 1e-4, "got {yaw}");
    }

    #[test]
    fn test_normalize_yaw() {
        assert_eq!(normalize_yaw(360.0), 0.0);
        assert!((normalize_yaw(-90.0) - 270.0).abs() < 1e-4);
        assert!((normalize_yaw(725.0) - 5.0).abs() < 1e-3);
        assert_eq!(normalize_yaw(f32::NAN), 0.0);
        let tiny = normalize_yaw(-1e-9);
        assert!((0.0..FULL_TURN_DEG).contains(&tiny));
    }
}
