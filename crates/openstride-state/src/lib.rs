//! # openstride-state
//!
//! Process-wide treadmill motion state shared between the sample writer and
//! the host threads that inject it.
//!
//! ## Safety Guarantees
//!
//! - **No heap allocations**: every type here is a fixed set of atomics
//! - **No blocking**: readers never wait for the writer
//! - **Single writer**: exactly one producer (bridge callback or shared-memory
//!   consumer loop) publishes; any number of host threads read
//!
//! Readers may observe `x`, `y` and `yaw` from two adjacent updates. Downstream
//! smoothing makes that skew invisible, so no lock guards the group.
//!
//! ## Usage
//!
//! ```rust
//! use openstride_state::prelude::*;
//!
//! let state = TreadmillState::new();
//! state.publish(MotionSample::new(0.25, -0.5, 90.0), 1_000);
//!
//! let snapshot = state.snapshot();
//! assert!(snapshot.active);
//! assert_eq!(snapshot.update_count, 1);
//! ```

#![no_std]
#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

pub mod counters;
pub mod treadmill;

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod clock;

pub mod prelude;

pub use counters::{CounterSnapshot, MotionCounters};
pub use openstride_filters::MotionSample;
pub use treadmill::{MotionSnapshot, TreadmillState};

#[cfg(feature = "std")]
pub use clock::{MonotonicClock, unix_time_ms};
