//! Named OS mapping holding one [`SharedMotionRecord`].

use std::fmt;

use openstride_errors::SharedMemoryError;
use shared_memory::{Shmem, ShmemConf, ShmemError};

use crate::record::{RECORD_SIZE, SharedMotionRecord};

/// Session-local segment name shared by every OpenStride host.
#[cfg(windows)]
pub const DEFAULT_SEGMENT_NAME: &str = r"Local\OpenStrideMotion";

/// Session-local segment name shared by every OpenStride host.
#[cfg(not(windows))]
pub const DEFAULT_SEGMENT_NAME: &str = "/openstride_motion";

/// A mapped motion segment.
pub struct MotionSegment {
    shmem: Shmem,
    name: String,
    created: bool,
}

// SAFETY: the mapping is only accessed through `record()`, whose fields are
// all atomics. `Shmem` holds raw handles with no thread affinity.
unsafe impl Send for MotionSegment {}
// SAFETY: as above.
unsafe impl Sync for MotionSegment {}

impl fmt::Debug for MotionSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionSegment")
            .field("name", &self.name)
            .field("created", &self.created)
            .field("len", &self.shmem.len())
            .finish()
    }
}

impl MotionSegment {
    /// Create a new segment. Fails if one with this name exists.
    ///
    /// # Errors
    ///
    /// [`SharedMemoryError::CreateFailed`] with the OS reason.
    pub fn create(name: &str) -> Result<Self, SharedMemoryError> {
        let shmem = ShmemConf::new()
            .size(RECORD_SIZE)
            .os_id(name)
            .create()
            .map_err(|err| create_failed(name, &err))?;
        Self::from_mapping(shmem, name, true)
    }

    /// Open an existing segment.
    ///
    /// # Errors
    ///
    /// [`SharedMemoryError::OpenFailed`] if it does not exist,
    /// [`SharedMemoryError::TooSmall`] if it cannot hold the record.
    pub fn open(name: &str) -> Result<Self, SharedMemoryError> {
        let shmem = ShmemConf::new()
            .os_id(name)
            .open()
            .map_err(|err| SharedMemoryError::OpenFailed {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        Self::from_mapping(shmem, name, false)
    }

    fn from_mapping(shmem: Shmem, name: &str, created: bool) -> Result<Self, SharedMemoryError> {
        if shmem.len() < RECORD_SIZE {
            return Err(SharedMemoryError::TooSmall {
                actual: shmem.len(),
                expected: RECORD_SIZE,
            });
        }
        if shmem
            .as_ptr()
            .align_offset(std::mem::align_of::<SharedMotionRecord>())
            != 0
        {
            return Err(SharedMemoryError::OpenFailed {
                name: name.to_string(),
                reason: "mapping is misaligned".to_string(),
            });
        }
        Ok(Self {
            shmem,
            name: name.to_string(),
            created,
        })
    }

    /// The record at the start of the mapping.
    pub fn record(&self) -> &SharedMotionRecord {
        // SAFETY: `from_mapping` checked size and alignment; the mapping
        // lives as long as `self`; all-zero bytes are a valid
        // `SharedMotionRecord` and every field is accessed atomically.
        unsafe { &*self.shmem.as_ptr().cast::<SharedMotionRecord>() }
    }

    /// OS name of the segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this process created the segment.
    pub fn created(&self) -> bool {
        self.created
    }
}

fn create_failed(name: &str, err: &ShmemError) -> SharedMemoryError {
    let reason = match err {
        ShmemError::MappingIdExists => "segment already exists".to_string(),
        other => other.to_string(),
    };
    SharedMemoryError::CreateFailed {
        name: name.to_string(),
        reason,
    }
}
