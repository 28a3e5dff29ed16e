//! Commonly used injection types.

pub use crate::blend::{ACTIVE_THRESHOLD, Sample, Vec2, blend, blend_decision};
pub use crate::classify::{ActionRegistry, FloatAxis};
pub use crate::controller::ControllerFilter;
pub use crate::injector::{Injector, MotionLink};
