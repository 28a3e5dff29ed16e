//! Prelude for openstride-state.
//!
//! ```rust
//! use openstride_state::prelude::*;
//!
//! let counters = MotionCounters::new();
//! counters.inc_sample();
//! let state = TreadmillState::new();
//! assert!(!state.is_active());
//! ```

pub use crate::counters::{CounterSnapshot, MotionCounters};
pub use crate::treadmill::{MotionSnapshot, TreadmillState};
pub use openstride_filters::MotionSample;

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub use crate::clock::{MonotonicClock, unix_time_ms};
