//! Log sink setup for OpenStride components
//!
//! Every shim runs inside somebody else's process, so logs go to two places
//! the operator can reach without a console:
//! - an append-only, timestamped text file next to the shim
//! - the OS debug-output stream (`OutputDebugStringA` on Windows, standard
//!   error elsewhere)
//!
//! The level is reloadable at runtime: the SteamVR `debug` request and the
//! config `debugLog` flag both go through [`LogHandle::set_debug`].
//!
//! # Example
//!
//! ```rust,no_run
//! use openstride_tracing::{LogConfig, init_logging};
//!
//! let handle = init_logging(LogConfig::new("openxr-layer").with_file("treadmill_layer.log"))?;
//! tracing::info!("layer loaded");
//! handle.set_debug(true)?;
//! # Ok::<(), openstride_tracing::TracingError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod level;
pub mod platform;
pub mod prelude;
pub mod subscriber;

pub use error::TracingError;
pub use level::{LogLevel, base_level, level_for};
pub use subscriber::{LogConfig, LogHandle, init_logging};
