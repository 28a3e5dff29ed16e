//! Cross-process treadmill sharing.
//!
//! Only one process may open the treadmill's serial port. The first OpenStride
//! host to start becomes the **master**: it drives the hardware and mirrors
//! every sample into a small named shared-memory segment. Later hosts become
//! **consumers** and poll that segment. If the master process dies, a
//! consumer notices the stale record and takes over the hardware.
//!
//! # Record
//!
//! [`SharedMotionRecord`] is a 96-byte `#[repr(C)]` struct made only of
//! atomics, guarded by a sequence counter so readers never see a half-written
//! sample. The master slot is claimed with a compare-exchange on the stored
//! process id.
//!
//! # Consumers
//!
//! Consumers re-derive `x`/`y` from the raw gamepad bytes with their own
//! deadzone and speed settings and take only the heading verbatim.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use openstride_bridge::{BridgeConfig, DynamicBridge, NativeBridge, SampleProcessor};
//! use openstride_filters::ConditionerState;
//! use openstride_shm::prelude::*;
//! use openstride_state::{MotionCounters, TreadmillState};
//!
//! let counters = Arc::new(MotionCounters::new());
//! let processor = Arc::new(SampleProcessor::new(
//!     ConditionerState::default(),
//!     Arc::new(TreadmillState::new()),
//!     Arc::clone(&counters),
//! ));
//! let transport = MotionTransport::new(
//!     TransportOptions::default(),
//!     processor,
//!     counters,
//!     Arc::new(SystemProcessProbe::new()),
//!     Arc::new(|| {
//!         Box::new(DynamicBridge::new(BridgeConfig::new("OmniBridge.dll", "COM3", 115_200)))
//!             as Box<dyn NativeBridge>
//!     }),
//! );
//! let role = transport.start();
//! # let _ = role;
//! transport.dispose();
//! ```

#![expect(unsafe_code, reason = "maps the shared segment")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod prelude;
pub mod probe;
pub mod record;
pub mod segment;
pub mod stale;
pub mod transport;

pub use openstride_errors::SharedMemoryError;
pub use probe::{ProcessProbe, SystemProcessProbe};
pub use record::{
    DEFAULT_READ_ATTEMPTS, MotionUpdate, RECORD_MAGIC, RECORD_SIZE, RECORD_VERSION, RecordSnapshot,
    SharedMotionRecord,
};
pub use segment::{DEFAULT_SEGMENT_NAME, MotionSegment};
pub use stale::{STALE_COUNT_THRESHOLD, StaleTracker};
pub use transport::{
    BridgeFactory, JOIN_TIMEOUT, MotionTransport, POLL_INTERVAL, PollOutcome, STALE_THRESHOLD_MS,
    TransportOptions, TransportRole,
};
