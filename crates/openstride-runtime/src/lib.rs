//! Process-wide treadmill motion runtime.
//!
//! Each host shim is a cdylib loaded into a VR runtime or a game. It keeps
//! one [`MotionRuntime`] in a [`RuntimeSlot`]: the runtime loads the config,
//! installs logging, elects a shared-memory role and exposes the
//! [`Injector`](openstride_injection::Injector) the shim calls on every
//! intercepted read.
//!
//! # Example
//!
//! ```no_run
//! use openstride_runtime::prelude::*;
//!
//! static RUNTIME: RuntimeSlot = RuntimeSlot::new();
//!
//! let runtime = RUNTIME.get_or_start(|| {
//!     RuntimeOptions::new("openxr-layer")
//!         .with_config_file("treadmill_layer_config.json")
//!         .with_log_file("treadmill_layer.log")
//! });
//! println!("connected: {}", runtime.is_connected());
//! RUNTIME.shutdown();
//! ```

#![expect(unsafe_code, reason = "module path lookup and epoch-managed snapshots")]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod guard;
pub mod module_path;
pub mod prelude;
pub mod runtime;
pub mod slot;
pub mod snapshot;

pub use guard::ffi_guard;
pub use module_path::{module_dir_of, module_path_of};
pub use runtime::{ConfigSource, MotionRuntime, RuntimeOptions};
pub use slot::RuntimeSlot;
pub use snapshot::SnapshotCell;
