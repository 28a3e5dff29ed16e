//! In-memory stand-ins for the vendor module and the OS process table.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use openstride_bridge::{NativeBridge, SampleSink};
use openstride_errors::HardwareError;
use openstride_filters::RawSample;
use openstride_shm::{BridgeFactory, ProcessProbe};
use parking_lot::Mutex;

#[derive(Default)]
struct FakeBridgeInner {
    sink: Mutex<Option<Arc<dyn SampleSink>>>,
    fail_with: Mutex<Option<HardwareError>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

/// Vendor bridge that delivers samples only when a test calls
/// [`FakeBridgeHandle::emit`].
#[derive(Clone, Default)]
pub struct FakeBridge {
    inner: Arc<FakeBridgeInner>,
}

/// Test-side view of a [`FakeBridge`] after it has been moved elsewhere.
#[derive(Clone)]
pub struct FakeBridgeHandle {
    inner: Arc<FakeBridgeInner>,
}

impl std::fmt::Debug for FakeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBridge")
            .field("connected", &self.inner.sink.lock().is_some())
            .finish()
    }
}

impl std::fmt::Debug for FakeBridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBridgeHandle").finish_non_exhaustive()
    }
}

impl FakeBridge {
    /// A bridge that connects successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge whose `connect` fails with `err`.
    pub fn failing(err: HardwareError) -> Self {
        let bridge = Self::default();
        *bridge.inner.fail_with.lock() = Some(err);
        bridge
    }

    /// Handle for driving and inspecting this bridge.
    pub fn handle(&self) -> FakeBridgeHandle {
        FakeBridgeHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// A factory that hands out clones of this bridge.
    pub fn factory(&self) -> BridgeFactory {
        let bridge = self.clone();
        Arc::new(move || Box::new(bridge.clone()) as Box<dyn NativeBridge>)
    }
}

impl NativeBridge for FakeBridge {
    fn connect(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), HardwareError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.fail_with.lock().clone() {
            return Err(err);
        }
        *self.inner.sink.lock() = Some(sink);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.inner.sink.lock().take().is_some() {
            self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.sink.lock().is_some()
    }
}

impl FakeBridgeHandle {
    /// Deliver one sample as the vendor thread would. Returns whether a sink
    /// was connected.
    pub fn emit(&self, sample: RawSample) -> bool {
        let sink = self.inner.sink.lock().clone();
        match sink {
            Some(sink) => {
                sink.on_sample(sample);
                true
            }
            None => false,
        }
    }

    /// Whether a sink is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.sink.lock().is_some()
    }

    /// Number of `connect` calls.
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of disconnects of a live connection.
    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }
}

/// Process table controlled by the test.
#[derive(Debug, Default)]
pub struct FakeProcessProbe {
    alive: Mutex<HashSet<u32>>,
}

impl FakeProcessProbe {
    /// A table where exactly `pids` are alive.
    pub fn with_alive(pids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            alive: Mutex::new(pids.into_iter().collect()),
        }
    }

    /// Mark `pid` alive.
    pub fn spawn(&self, pid: u32) {
        self.alive.lock().insert(pid);
    }

    /// Mark `pid` dead.
    pub fn kill(&self, pid: u32) {
        self.alive.lock().remove(&pid);
    }
}

impl ProcessProbe for FakeProcessProbe {
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0 && self.alive.lock().contains(&pid)
    }
}

static NEXT_SEGMENT: AtomicU32 = AtomicU32::new(0);

/// A segment name no other test in this run uses.
pub fn unique_segment_name(tag: &str) -> String {
    let n = NEXT_SEGMENT.fetch_add(1, Ordering::Relaxed);
    if cfg!(windows) {
        format!(r"Local\OST_{tag}_{}_{n}", std::process::id())
    } else {
        format!("/ost_{tag}_{}_{n}", std::process::id())
    }
}
