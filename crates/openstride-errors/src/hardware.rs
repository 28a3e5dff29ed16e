//! Vendor bridge module and serial connection errors.
//!
//! All of these leave the bridge disconnected and injection disabled; none
//! of them are surfaced to the host application.

use crate::severity::ErrorSeverity;

/// Hardware bridge errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The vendor module could not be loaded from any candidate path
    #[error("Vendor module not found: {path}")]
    ModuleNotFound {
        /// Last path that was tried
        path: String,
    },

    /// A required entry point is missing from the vendor module
    #[error("Vendor module is missing required symbol {symbol}")]
    SymbolMissing {
        /// Symbol name
        symbol: String,
    },

    /// The vendor create-instance call returned null
    #[error("Vendor module failed to create a reader instance")]
    InstanceCreationFailed,

    /// Opening the serial port failed
    #[error("Failed to connect to treadmill on {port} at {baud_rate} baud")]
    ConnectFailed {
        /// Serial port name
        port: String,
        /// Baud rate
        baud_rate: i32,
    },

    /// A port name contained an interior NUL byte
    #[error("Invalid serial port name: {0:?}")]
    InvalidPort(String),

    /// Another bridge in this process already owns the vendor callback
    #[error("A treadmill connection is already active in this process")]
    AlreadyConnected,
}

impl HardwareError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HardwareError::ModuleNotFound { .. } => ErrorSeverity::Error,
            HardwareError::SymbolMissing { .. } => ErrorSeverity::Error,
            HardwareError::InstanceCreationFailed => ErrorSeverity::Error,
            HardwareError::ConnectFailed { .. } => ErrorSeverity::Warning,
            HardwareError::InvalidPort(_) => ErrorSeverity::Error,
            HardwareError::AlreadyConnected => ErrorSeverity::Warning,
        }
    }

    /// Whether the failure may clear on its own (port busy, device unplugged).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HardwareError::ConnectFailed { .. } | HardwareError::AlreadyConnected
        )
    }
}
