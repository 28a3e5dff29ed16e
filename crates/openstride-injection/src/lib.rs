//! Treadmill injection policy.
//!
//! Every host shim funnels its intercepted input reads through this crate:
//! classify the action once when the host creates it, then on each read
//! decide whether and how treadmill motion replaces the host's own value.
//!
//! # Overview
//!
//! - [`blend`]: the Override / Additive / Smart policy for one value
//! - [`ActionRegistry`]: movement classification keyed by native action handle
//! - [`ControllerFilter`]: slot filter for hosts without named actions
//! - [`Injector`]: reads the live state and applies the policy
//!
//! # RT Safety
//!
//! `blend` and the `Injector::inject_*` methods read atomics and do
//! arithmetic only: no locks, no allocation. Registration allocates and is
//! meant for action creation time.
//!
//! # Example
//!
//! ```
//! use openstride_config::InputMode;
//! use openstride_injection::prelude::*;
//!
//! let prior = Sample::new(Vec2::new(0.2, 0.0), true);
//! let idle = blend(prior, Vec2::new(0.01, 0.0), InputMode::Smart, ACTIVE_THRESHOLD);
//! assert_eq!(idle, prior);
//!
//! let walking = blend(prior, Vec2::new(0.0, 0.8), InputMode::Smart, ACTIVE_THRESHOLD);
//! assert_eq!(walking, Sample::new(Vec2::new(0.0, 0.8), true));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod blend;
pub mod classify;
pub mod controller;
pub mod injector;
pub mod prelude;

pub use blend::{ACTIVE_THRESHOLD, Blendable, Sample, Vec2, blend, blend_decision};
pub use classify::{ActionInfo, ActionRegistry, FloatAxis};
pub use controller::ControllerFilter;
pub use injector::{INJECTION_LOG_INTERVAL, Injector, MotionLink};
pub use openstride_config::{ControllerTarget, InputMode};
