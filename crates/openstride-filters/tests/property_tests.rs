//! Property-Based Tests for the conditioning functions

use openstride_filters::prelude::*;

fn circular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn deadzone_zeroes_inside(deadzone in 0.0f32..0.99, frac in 0.0f32..1.0, negative in any::<bool>()) {
            let magnitude = deadzone * frac;
            let value = if negative { -magnitude } else { magnitude };
            prop_assume!(value.abs() < deadzone);
            prop_assert_eq!(apply_deadzone(value, deadzone), 0.0);
        }

        #[test]
        fn deadzone_keeps_sign_outside(deadzone in 0.0f32..0.99, value in -1.0f32..1.0) {
            prop_assume!(value.abs() >= deadzone);
            let out = apply_deadzone(value, deadzone);
            prop_assert!(out.abs() <= 1.0);
            prop_assert!(out == 0.0 || out.signum() == value.signum());
        }

        #[test]
        fn deadzone_end_points(deadzone in 0.0f32..0.99) {
            prop_assert_eq!(apply_deadzone(deadzone, deadzone), 0.0);
            prop_assert!((apply_deadzone(1.0, deadzone) - 1.0).abs() < 1e-5);
        }

        #[test]
        fn smoothing_end_points(current in -10.0f32..10.0, target in -10.0f32..10.0) {
            prop_assert_eq!(apply_smoothing(current, target, 1.0), target);
            prop_assert_eq!(apply_smoothing(current, target, 0.0), current);
        }

        #[test]
        fn smoothing_stays_between(current in -1.0f32..1.0, target in -1.0f32..1.0, factor in 0.0f32..1.0) {
            let out = apply_smoothing(current, target, factor);
            let lo = current.min(target) - 1e-6;
            let hi = current.max(target) + 1e-6;
            prop_assert!(out >= lo && out <= hi);
        }

        #[test]
        fn yaw_step_is_bounded(current in 0.0f32..360.0, target in 0.0f32..360.0, factor in 0.0f32..1.0) {
            let out = smooth_yaw(current, target, factor);
            prop_assert!((0.0..360.0).contains(&out));
            prop_assert!(circular_distance(out, current) <= factor * 180.0 + 1e-3);
        }

        #[test]
        fn conditioned_sample_in_range(angle in -720.0f32..720.0, gx in 0i32..=255, gy in 0i32..=255, speed in 0.0f32..5.0) {
            let mut state = ConditionerState::new(0.1, speed, 0.3);
            let sample = condition_filter(RawSample::new(angle, gx, gy), &mut state);
            prop_assert!(sample.x.abs() <= 1.0);
            prop_assert!(sample.y.abs() <= 1.0);
            prop_assert!((0.0..360.0).contains(&sample.yaw));
        }
    }
}

#[cfg(test)]
mod quickcheck_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn empty_pattern_never_matches(text: String) -> bool {
        !matches_pattern(&text, "")
    }

    #[quickcheck]
    fn contains_pattern_is_case_insensitive(prefix: String, suffix: String) -> bool {
        let text = format!("{prefix}MoVe{suffix}");
        matches_pattern(&text, "*move*")
    }

    #[quickcheck]
    fn normalize_yaw_is_in_range(degrees: f32) -> bool {
        let out = normalize_yaw(degrees);
        (0.0..360.0).contains(&out)
    }

    #[quickcheck]
    fn raw_axes_in_unit_range(gx: u8, gy: u8) -> bool {
        let state = ConditionerState::new(0.1, 1.5, 0.3);
        let (x, y) = condition_raw_axes(i32::from(gx), i32::from(gy), &state);
        x.abs() <= 1.0 && y.abs() <= 1.0
    }
}
