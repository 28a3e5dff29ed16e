//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use openstride_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_some, wait_until};

#[cfg(feature = "tracking")]
pub use crate::tracking::{AllocationGuard, TrackingAllocator, track};

#[cfg(feature = "fakes")]
pub use crate::fakes::{FakeBridge, FakeBridgeHandle, FakeProcessProbe, unique_segment_name};

/// Result type for tests that use `?`.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;
