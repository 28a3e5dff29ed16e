//! Commonly used transport types.

pub use crate::probe::{ProcessProbe, SystemProcessProbe};
pub use crate::record::{MotionUpdate, RecordSnapshot, SharedMotionRecord};
pub use crate::segment::MotionSegment;
pub use crate::transport::{BridgeFactory, MotionTransport, TransportOptions, TransportRole};
pub use openstride_errors::SharedMemoryError;
