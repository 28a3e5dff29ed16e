//! Lazily started, process-wide runtime for a cdylib shim.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::{MotionRuntime, RuntimeOptions};
use crate::snapshot::SnapshotCell;

/// Holds at most one [`MotionRuntime`].
///
/// A shim declares one as a `static`, starts it on the first host call and
/// shuts it down when the host unloads the module. [`RuntimeSlot::get`]
/// never blocks; starting and shutting down are serialized.
pub struct RuntimeSlot {
    current: SnapshotCell<Arc<MotionRuntime>>,
    lifecycle: Mutex<()>,
}

impl fmt::Debug for RuntimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSlot")
            .field("started", &self.current.is_set())
            .finish()
    }
}

impl Default for RuntimeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeSlot {
    /// Empty slot.
    pub const fn new() -> Self {
        Self {
            current: SnapshotCell::new(),
            lifecycle: parking_lot::const_mutex(()),
        }
    }

    /// Running runtime, if any.
    pub fn get(&self) -> Option<Arc<MotionRuntime>> {
        self.current.load(|runtime| runtime.cloned())
    }

    /// Running runtime, starting one from `options` if the slot is empty.
    pub fn get_or_start(&self, options: impl FnOnce() -> RuntimeOptions) -> Arc<MotionRuntime> {
        if let Some(runtime) = self.get() {
            return runtime;
        }
        let _lifecycle = self.lifecycle.lock();
        if let Some(runtime) = self.get() {
            return runtime;
        }
        let runtime = Arc::new(MotionRuntime::start(options()));
        self.current.store(Some(Arc::clone(&runtime)));
        runtime
    }

    /// Shut down and empty the slot. A later `get_or_start` starts afresh.
    pub fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock();
        if let Some(runtime) = self.current.take() {
            runtime.shutdown();
        }
    }
}
