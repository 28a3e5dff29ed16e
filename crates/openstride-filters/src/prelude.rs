//! Prelude for the filters crate.
//!
//! ```
//! use openstride_filters::prelude::*;
//!
//! let mut state = ConditionerState::default();
//! let sample = condition_filter(RawSample::new(180.0, 127, 127), &mut state);
//! assert!(sample.x.abs() < 1e-6);
//! ```

pub use crate::conditioner::{
    ConditionerState, MotionSample, RawSample, condition_filter, condition_raw_axes,
};
pub use crate::deadzone::{apply_deadzone, clamp_unit, normalize_gamepad_axis};
pub use crate::pattern::{any_pattern_matches, matches_pattern};
pub use crate::smoothing::{apply_smoothing, normalize_yaw, smooth_yaw};
