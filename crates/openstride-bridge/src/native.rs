//! The bridge seam.

use std::sync::Arc;

use openstride_errors::HardwareError;
use openstride_filters::RawSample;

/// Receiver of raw vendor samples.
///
/// Called on a thread owned by the vendor module, at packet rate. Each call
/// supersedes the previous one; implementations must not queue.
pub trait SampleSink: Send + Sync {
    /// Handle one sample.
    fn on_sample(&self, sample: RawSample);
}

/// A connection to the treadmill that delivers samples to a sink.
pub trait NativeBridge: Send {
    /// Open the connection and start delivering samples to `sink`.
    ///
    /// On failure everything acquired during the attempt has been released.
    ///
    /// # Errors
    ///
    /// Returns the [`HardwareError`] of the step that failed.
    fn connect(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), HardwareError>;

    /// Stop delivery and release everything. Safe to call repeatedly.
    fn disconnect(&mut self);

    /// Whether samples are currently being delivered.
    fn is_connected(&self) -> bool;
}

impl<T: SampleSink + ?Sized> SampleSink for Arc<T> {
    fn on_sample(&self, sample: RawSample) {
        (**self).on_sample(sample);
    }
}

impl<T: NativeBridge + ?Sized> NativeBridge for Box<T> {
    fn connect(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), HardwareError> {
        (**self).connect(sink)
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
