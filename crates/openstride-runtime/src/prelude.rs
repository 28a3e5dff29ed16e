//! Commonly used runtime types.

pub use crate::guard::ffi_guard;
pub use crate::runtime::{ConfigSource, MotionRuntime, RuntimeOptions};
pub use crate::slot::RuntimeSlot;
