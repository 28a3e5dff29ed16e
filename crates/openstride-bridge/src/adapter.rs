//! Non-fatal owner of a [`NativeBridge`].
//!
//! Host shims must keep working without a treadmill, so failures here are
//! logged and reported as `false` rather than propagated.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::native::{NativeBridge, SampleSink};

/// Lock-free view of whether the bridge is delivering samples.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus(Arc<AtomicBool>);

impl ConnectionStatus {
    /// Whether the bridge is connected.
    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, connected: bool) {
        self.0.store(connected, Ordering::Release);
    }
}

/// Owns a bridge and exposes `initialize`/`shutdown`/`is_connected`.
#[derive(Debug)]
pub struct HardwareBridge<B: NativeBridge> {
    native: B,
    status: ConnectionStatus,
}

impl<B: NativeBridge> HardwareBridge<B> {
    /// Wrap a disconnected bridge.
    pub fn new(native: B) -> Self {
        Self {
            native,
            status: ConnectionStatus::default(),
        }
    }

    /// Connect and start delivering samples to `sink`.
    ///
    /// Returns `true` if connected, including when already connected. On
    /// `false` the cause has been logged and nothing is held.
    pub fn initialize(&mut self, sink: Arc<dyn SampleSink>) -> bool {
        if self.native.is_connected() {
            return true;
        }

        match self.native.connect(sink) {
            Ok(()) => {
                self.status.set(true);
                true
            }
            Err(err) => {
                tracing::error!(error = %err, severity = ?err.severity(), "Treadmill bridge unavailable");
                self.status.set(false);
                false
            }
        }
    }

    /// Disconnect. Safe to call when not connected.
    pub fn shutdown(&mut self) {
        self.native.disconnect();
        self.status.set(false);
    }

    /// Whether samples are being delivered.
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// A status handle that outlives borrows of the bridge.
    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// The wrapped bridge.
    pub fn native(&self) -> &B {
        &self.native
    }
}

impl<B: NativeBridge> Drop for HardwareBridge<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
