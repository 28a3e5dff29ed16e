//! Configuration errors.
//!
//! Loading never fails outright; these describe why a value was ignored.

use crate::severity::ErrorSeverity;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Failed to read config file {path}: {reason}")]
    Read {
        /// File path
        path: String,
        /// OS message
        reason: String,
    },

    /// A value could not be parsed for its key
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Config key
        key: String,
        /// Raw value text
        value: String,
    },

    /// A numeric value is outside its accepted range
    #[error("{key} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Config key
        key: String,
        /// Parsed value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

impl ConfigError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigError::Read { .. } => ErrorSeverity::Warning,
            ConfigError::InvalidValue { .. } => ErrorSeverity::Warning,
            ConfigError::OutOfRange { .. } => ErrorSeverity::Warning,
        }
    }

    /// Create an invalid value error.
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an out of range error.
    pub fn out_of_range(key: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        ConfigError::OutOfRange {
            key: key.into(),
            value,
            min,
            max,
        }
    }
}
