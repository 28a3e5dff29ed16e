//! Configuration for OpenStride host integrations.
//!
//! Each shim loads one [`Config`] at process attach and never mutates it. The
//! file format is a forgiving line-oriented `key: value` list that also
//! accepts the JSON files users already have:
//!
//! ```text
//! {
//!     "enabled": true,           // master switch
//!     "comPort": "COM3",
//!     "inputMode": "smart",
//!     "actionPatterns": ["*move*", "*walk*"]
//! }
//! ```
//!
//! Loading never fails. A missing file means defaults; a bad value keeps the
//! default for that key and produces a [`ConfigError`] warning.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs)]

mod model;
mod parse;
pub mod prelude;

pub use model::{ControllerTarget, Config, InputMode, default_action_patterns};
pub use openstride_errors::ConfigError;
pub use parse::{parse_config, split_key_value};
