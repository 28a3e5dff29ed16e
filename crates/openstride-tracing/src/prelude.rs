//! Prelude for openstride-tracing.

pub use crate::error::TracingError;
pub use crate::level::{LogLevel, level_for};
pub use crate::subscriber::{LogConfig, LogHandle, init_logging};
