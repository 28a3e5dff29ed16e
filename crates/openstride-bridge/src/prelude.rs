//! Commonly used bridge types.

pub use crate::adapter::{ConnectionStatus, HardwareBridge};
pub use crate::dynamic::{BridgeConfig, DynamicBridge};
pub use crate::native::{NativeBridge, SampleSink};
pub use crate::processor::SampleProcessor;
pub use openstride_errors::HardwareError;
pub use openstride_filters::RawSample;
