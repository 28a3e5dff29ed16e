//! Cross-process shared-memory transport errors.
//!
//! Any of these makes the process fall back to driving the hardware itself.

use crate::severity::ErrorSeverity;

/// Shared-memory transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SharedMemoryError {
    /// Creating the named segment failed
    #[error("Failed to create shared segment {name}: {reason}")]
    CreateFailed {
        /// Segment name
        name: String,
        /// OS or library message
        reason: String,
    },

    /// Opening an existing segment failed
    #[error("Failed to open shared segment {name}: {reason}")]
    OpenFailed {
        /// Segment name
        name: String,
        /// OS or library message
        reason: String,
    },

    /// The segment is smaller than the motion record
    #[error("Shared segment too small: {actual} bytes, need {expected}")]
    TooSmall {
        /// Mapped size
        actual: usize,
        /// Record size
        expected: usize,
    },

    /// Magic or version does not match this build
    #[error("Incompatible shared record: magic={magic:#010x}, version={version}")]
    IncompatibleRecord {
        /// Magic read from the segment
        magic: u32,
        /// Version read from the segment
        version: u32,
    },

    /// The writer kept the record in an inconsistent state for every attempt
    #[error("Shared record unstable after {attempts} read attempts")]
    TornRead {
        /// Attempts made
        attempts: u32,
    },

    /// Another live process already owns the master slot
    #[error("Master slot already held by process {pid}")]
    MasterTaken {
        /// Owning process id
        pid: u32,
    },
}

impl SharedMemoryError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SharedMemoryError::CreateFailed { .. } => ErrorSeverity::Error,
            SharedMemoryError::OpenFailed { .. } => ErrorSeverity::Warning,
            SharedMemoryError::TooSmall { .. } => ErrorSeverity::Error,
            SharedMemoryError::IncompatibleRecord { .. } => ErrorSeverity::Warning,
            SharedMemoryError::TornRead { .. } => ErrorSeverity::Info,
            SharedMemoryError::MasterTaken { .. } => ErrorSeverity::Info,
        }
    }

    /// Whether a consumer should treat this as "no master present".
    pub fn means_no_master(&self) -> bool {
        matches!(
            self,
            SharedMemoryError::OpenFailed { .. }
                | SharedMemoryError::TooSmall { .. }
                | SharedMemoryError::IncompatibleRecord { .. }
        )
    }
}
