//! Centralized error types for OpenStride
//!
//! Every failure in this workspace is non-fatal to the host application: the
//! worst outcome is that treadmill motion is not injected. The taxonomy below
//! lets callers decide between "fall back quietly" and "log loudly once".
//!
//! # Architecture
//!
//! - [`severity`]: the severity shared by every family
//! - [`hardware`]: vendor bridge module and serial connection failures
//! - [`shared_memory`]: cross-process segment failures
//! - [`config`]: configuration read and value problems
//! - [`host`]: failures at the VR runtime boundary
//!
//! # Example
//!
//! ```
//! use openstride_errors::prelude::*;
//!
//! fn connect(port: &str) -> Result<(), HardwareError> {
//!     Err(HardwareError::ConnectFailed { port: port.into(), baud_rate: 115_200 })
//! }
//!
//! let err = connect("COM3").unwrap_err();
//! assert_eq!(err.severity(), ErrorSeverity::Warning);
//! assert!(err.severity().is_recoverable());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod hardware;
pub mod host;
pub mod prelude;
pub mod severity;
pub mod shared_memory;

pub use config::ConfigError;
pub use hardware::HardwareError;
pub use host::HostError;
pub use severity::ErrorSeverity;
pub use shared_memory::SharedMemoryError;
