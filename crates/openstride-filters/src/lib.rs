//! Signal conditioning for treadmill locomotion samples
//!
//! This crate turns raw treadmill readings (ring angle plus two gamepad-style
//! bytes) into the normalized, smoothed motion values that every host
//! integration injects into VR input.
//!
//! # Overview
//!
//! - **Deadzone**: suppresses sensor noise near rest and rescales the remaining range
//! - **Smoothing**: single-pole EMA for the linear axes
//! - **Yaw smoothing**: EMA on a circle, so 359° to 1° moves forward by 2°
//! - **Pattern matching**: case-insensitive `*` globs used to classify action names
//! - **Conditioner**: the full per-sample chain used by the hardware bridge
//!
//! # RT Safety
//!
//! The numeric functions never allocate, are O(1) and are defined for every
//! input (non-finite values collapse to zero). Pattern matching lowercases its
//! inputs and is meant for action creation, not the per-frame path.
//!
//! # Example
//!
//! ```
//! use openstride_filters::prelude::*;
//!
//! let mut state = ConditionerState::new(0.1, 1.0, 1.0);
//! let sample = condition_filter(RawSample::new(90.0, 254, 127), &mut state);
//!
//! assert!((sample.x - 1.0).abs() < 1e-6);
//! assert!(sample.y.abs() < 1e-6);
//! assert!((sample.yaw - 90.0).abs() < 1e-6);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod conditioner;
pub mod deadzone;
pub mod pattern;
pub mod prelude;
pub mod smoothing;

pub use conditioner::{
    ConditionerState, MotionSample, RawSample, condition_filter, condition_raw_axes,
};
pub use deadzone::{GAMEPAD_CENTER, apply_deadzone, clamp_unit, normalize_gamepad_axis};
pub use pattern::{any_pattern_matches, matches_pattern};
pub use smoothing::{apply_smoothing, normalize_yaw, smooth_yaw};
