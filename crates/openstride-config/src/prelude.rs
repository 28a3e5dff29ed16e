//! Prelude for openstride-config.

pub use crate::model::{Config, ControllerTarget, InputMode};
pub use crate::parse::parse_config;
pub use openstride_errors::ConfigError;
