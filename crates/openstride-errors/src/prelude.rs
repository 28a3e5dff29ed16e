//! Prelude module for convenient error handling imports.
//!
//! ```
//! use openstride_errors::prelude::*;
//!
//! fn open(name: &str) -> Result<(), SharedMemoryError> {
//!     Err(SharedMemoryError::OpenFailed { name: name.into(), reason: "absent".into() })
//! }
//!
//! assert!(open("openstride_motion").is_err_and(|e| e.means_no_master()));
//! ```

pub use crate::{
    config::ConfigError, hardware::HardwareError, host::HostError, severity::ErrorSeverity,
    shared_memory::SharedMemoryError,
};
