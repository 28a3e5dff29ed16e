//! Tracing error types

use core::fmt;

/// Log setup errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The log file could not be opened for appending
    #[error("Failed to open log file {path}: {reason}")]
    FileOpen {
        /// File path
        path: String,
        /// OS message
        reason: String,
    },

    /// A subscriber that is not ours is already installed
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,

    /// The level filter could not be swapped
    #[error("Failed to reload log level: {0}")]
    ReloadFailed(String),
}

impl TracingError {
    /// Check if logging can continue without this piece
    pub fn is_recoverable(&self) -> bool {
        match self {
            TracingError::FileOpen { .. } => true,
            TracingError::AlreadyInitialized => true,
            TracingError::ReloadFailed(_) => true,
        }
    }

    /// Create a reload error with context
    pub fn reload_failed(context: impl fmt::Display) -> Self {
        TracingError::ReloadFailed(context.to_string())
    }
}
