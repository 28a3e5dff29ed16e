//! Shared test utilities for OpenStride.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with `#[track_caller]`
//! - [`tracking`] - Allocation tracking for hot-path tests
//! - [`fakes`] - In-memory vendor bridge and process probe
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! openstride-test-helpers = { workspace = true }
//! ```
//!
//! Only use this from `tests/` directories: it links the library crates, so
//! a `#[cfg(test)]` module inside one of them would see two copies of its
//! own types.

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod must;
pub mod prelude;

#[cfg(feature = "tracking")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracking")))]
pub mod tracking;

#[cfg(feature = "fakes")]
#[cfg_attr(docsrs, doc(cfg(feature = "fakes")))]
pub mod fakes;

pub use must::*;

#[cfg(feature = "tracking")]
pub use tracking::track;
