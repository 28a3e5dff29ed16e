//! Errors at the VR runtime boundary.

use crate::severity::ErrorSeverity;

/// Host integration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The real runtime library could not be loaded
    #[error("Runtime library not found: {path}")]
    LibraryMissing {
        /// Path that was tried
        path: String,
    },

    /// The next layer or real library does not provide a function
    #[error("Runtime function {0} is unavailable")]
    FunctionUnavailable(String),

    /// A structure handed over by the host has the wrong type, version or size
    #[error("Structure mismatch in {structure}: {detail}")]
    StructMismatch {
        /// Structure name
        structure: &'static str,
        /// What did not match
        detail: String,
    },

    /// A real call returned a failure code; it is passed back unchanged
    #[error("{function} returned {code}")]
    CallFailed {
        /// Function name
        function: &'static str,
        /// Raw result code
        code: i64,
    },

    /// A requested interface version is not provided
    #[error("Interface {0} not found")]
    InterfaceNotFound(String),
}

impl HostError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HostError::LibraryMissing { .. } => ErrorSeverity::Critical,
            HostError::FunctionUnavailable(_) => ErrorSeverity::Error,
            HostError::StructMismatch { .. } => ErrorSeverity::Critical,
            HostError::CallFailed { .. } => ErrorSeverity::Info,
            HostError::InterfaceNotFound(_) => ErrorSeverity::Warning,
        }
    }
}
