//! Treadmill hardware bridge.
//!
//! The vendor ships a native module that decodes the treadmill's serial
//! protocol and calls back with `(ring angle, gamepad x, gamepad y)` samples.
//! This crate owns that module's lifecycle and turns its samples into
//! conditioned [`TreadmillState`](openstride_state::TreadmillState) updates.
//!
//! # Layers
//!
//! - [`NativeBridge`]: connect/disconnect contract, the seam tests replace
//! - [`DynamicBridge`]: the `libloading` implementation; the only unsafe code
//! - [`HardwareBridge`]: the non-fatal `initialize -> bool` owner used by shims
//! - [`SampleProcessor`]: conditioning and publication for each sample
//!
//! # Safety
//!
//! The vendor callback carries no context pointer, so one process-wide
//! trampoline forwards to the sink registered by the connected bridge. Only
//! one vendor connection can exist per process.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use openstride_bridge::prelude::*;
//! use openstride_filters::ConditionerState;
//! use openstride_state::{MotionCounters, TreadmillState};
//!
//! let state = Arc::new(TreadmillState::new());
//! let processor = Arc::new(SampleProcessor::new(
//!     ConditionerState::default(),
//!     Arc::clone(&state),
//!     Arc::new(MotionCounters::new()),
//! ));
//!
//! let config = BridgeConfig::new("C:/Games/OmniBridge.dll", "COM3", 115_200);
//! let mut bridge = HardwareBridge::new(DynamicBridge::new(config));
//! if !bridge.initialize(processor) {
//!     // pass-through mode
//! }
//! ```

#![expect(unsafe_code, reason = "loads the vendor module and calls its C entry points")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod adapter;
pub mod dynamic;
pub mod native;
pub mod prelude;
pub mod processor;

pub use adapter::{ConnectionStatus, HardwareBridge};
pub use dynamic::{
    BridgeConfig, DEFAULT_MODULE_NAME, DynamicBridge, SampleCallback, VendorApi, VendorFnTable,
};
pub use native::{NativeBridge, SampleSink};
pub use openstride_errors::HardwareError;
pub use openstride_filters::RawSample;
pub use processor::{SAMPLE_LOG_INTERVAL, SampleProcessor};
