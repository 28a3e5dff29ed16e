//! The cross-process motion record.
//!
//! One master writes, any number of consumers read. Every field is an atomic
//! so a reader can never fault on a half-written value; whole-record
//! consistency comes from the `sequence` field acting as a seqlock.

use std::hint::spin_loop;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering, fence};

use openstride_errors::SharedMemoryError;
use openstride_filters::MotionSample;

/// `"TRDM"` read as a little-endian `u32`.
pub const RECORD_MAGIC: u32 = 0x5452_444D;

/// Layout version.
pub const RECORD_VERSION: u32 = 1;

/// Size of [`SharedMotionRecord`] in bytes.
pub const RECORD_SIZE: usize = 96;

/// Default number of copy attempts before a read is reported as torn.
pub const DEFAULT_READ_ATTEMPTS: u32 = 16;

/// Fixed-layout record living in the shared segment.
#[repr(C)]
#[derive(Debug)]
pub struct SharedMotionRecord {
    magic: AtomicU32,
    version: AtomicU32,
    sequence: AtomicU64,
    x: AtomicU32,
    y: AtomicU32,
    yaw: AtomicU32,
    raw_x: AtomicI32,
    raw_y: AtomicI32,
    connected: AtomicU32,
    last_update_unix_ms: AtomicI64,
    update_count: AtomicU64,
    master_pid: AtomicU32,
    reserved: [AtomicU32; 9],
}

const _: () = assert!(std::mem::size_of::<SharedMotionRecord>() == RECORD_SIZE);
const _: () = assert!(std::mem::align_of::<SharedMotionRecord>() == 8);

/// One conditioned sample together with the raw bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionUpdate {
    /// Master-side conditioned values
    pub sample: MotionSample,
    /// Raw vendor X byte
    pub raw_x: i32,
    /// Raw vendor Y byte
    pub raw_y: i32,
}

/// A consistent copy of the record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordSnapshot {
    /// Master-side X
    pub x: f32,
    /// Master-side Y
    pub y: f32,
    /// Heading in degrees
    pub yaw: f32,
    /// Raw vendor X byte
    pub raw_x: i32,
    /// Raw vendor Y byte
    pub raw_y: i32,
    /// Whether the master's hardware is delivering samples
    pub connected: bool,
    /// Wall-clock time of the last write
    pub last_update_unix_ms: i64,
    /// Samples written since the segment was created
    pub update_count: u64,
    /// Process that owns the master slot, `0` if none
    pub master_pid: u32,
}

impl RecordSnapshot {
    /// Whether the last write is younger than `threshold_ms`.
    ///
    /// A record that was never written is not fresh. A timestamp slightly in
    /// the future (clock adjustment) counts as fresh.
    pub fn is_fresh(&self, now_unix_ms: i64, threshold_ms: i64) -> bool {
        self.last_update_unix_ms > 0
            && now_unix_ms.saturating_sub(self.last_update_unix_ms) < threshold_ms
    }
}

impl Default for SharedMotionRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMotionRecord {
    /// A zeroed record, as a fresh OS mapping reads.
    pub const fn new() -> Self {
        Self {
            magic: AtomicU32::new(0),
            version: AtomicU32::new(0),
            sequence: AtomicU64::new(0),
            x: AtomicU32::new(0),
            y: AtomicU32::new(0),
            yaw: AtomicU32::new(0),
            raw_x: AtomicI32::new(0),
            raw_y: AtomicI32::new(0),
            connected: AtomicU32::new(0),
            last_update_unix_ms: AtomicI64::new(0),
            update_count: AtomicU64::new(0),
            master_pid: AtomicU32::new(0),
            reserved: [const { AtomicU32::new(0) }; 9],
        }
    }

    /// Stamp magic and version and take the master slot for `pid`.
    ///
    /// `connected` is cleared; the sample counter is kept so consumers see a
    /// monotonic count across a takeover.
    pub fn initialize(&self, pid: u32) {
        self.write_with(|record| {
            record.magic.store(RECORD_MAGIC, Ordering::Relaxed);
            record.version.store(RECORD_VERSION, Ordering::Relaxed);
            record.connected.store(0, Ordering::Relaxed);
            record.master_pid.store(pid, Ordering::Relaxed);
        });
    }

    /// Check magic and version.
    ///
    /// # Errors
    ///
    /// [`SharedMemoryError::IncompatibleRecord`] when either differs.
    pub fn validate(&self) -> Result<(), SharedMemoryError> {
        let magic = self.magic.load(Ordering::Acquire);
        let version = self.version.load(Ordering::Acquire);
        if magic == RECORD_MAGIC && version == RECORD_VERSION {
            Ok(())
        } else {
            Err(SharedMemoryError::IncompatibleRecord { magic, version })
        }
    }

    /// Current master process id, `0` if the slot is free.
    pub fn master_pid(&self) -> u32 {
        self.master_pid.load(Ordering::Acquire)
    }

    /// Take the master slot if it still holds `expected`.
    ///
    /// # Errors
    ///
    /// [`SharedMemoryError::MasterTaken`] with the pid that won the race.
    pub fn claim_master(&self, expected: u32, pid: u32) -> Result<(), SharedMemoryError> {
        self.master_pid
            .compare_exchange(expected, pid, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|pid| SharedMemoryError::MasterTaken { pid })
    }

    /// Publish one sample and mark the master connected.
    pub fn write_sample(&self, update: &MotionUpdate, now_unix_ms: i64) -> u64 {
        let count = self.update_count.load(Ordering::Relaxed).wrapping_add(1);
        self.write_with(|record| {
            record.x.store(update.sample.x.to_bits(), Ordering::Relaxed);
            record.y.store(update.sample.y.to_bits(), Ordering::Relaxed);
            record.yaw.store(update.sample.yaw.to_bits(), Ordering::Relaxed);
            record.raw_x.store(update.raw_x, Ordering::Relaxed);
            record.raw_y.store(update.raw_y, Ordering::Relaxed);
            record.connected.store(1, Ordering::Relaxed);
            record.last_update_unix_ms.store(now_unix_ms, Ordering::Relaxed);
            record.update_count.store(count, Ordering::Relaxed);
        });
        count
    }

    /// Clear `connected` and free the master slot if `pid` holds it.
    pub fn release_master(&self, pid: u32) {
        self.write_with(|record| {
            record.connected.store(0, Ordering::Relaxed);
        });
        let _released = self
            .master_pid
            .compare_exchange(pid, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
    }

    /// Copy the record, retrying while a write is in progress.
    ///
    /// # Errors
    ///
    /// [`SharedMemoryError::TornRead`] after `attempts` unstable copies.
    pub fn read_stable(&self, attempts: u32) -> Result<RecordSnapshot, SharedMemoryError> {
        for _ in 0..attempts {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }

            let snapshot = RecordSnapshot {
                x: f32::from_bits(self.x.load(Ordering::Relaxed)),
                y: f32::from_bits(self.y.load(Ordering::Relaxed)),
                yaw: f32::from_bits(self.yaw.load(Ordering::Relaxed)),
                raw_x: self.raw_x.load(Ordering::Relaxed),
                raw_y: self.raw_y.load(Ordering::Relaxed),
                connected: self.connected.load(Ordering::Relaxed) != 0,
                last_update_unix_ms: self.last_update_unix_ms.load(Ordering::Relaxed),
                update_count: self.update_count.load(Ordering::Relaxed),
                master_pid: self.master_pid.load(Ordering::Relaxed),
            };

            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return Ok(snapshot);
            }
            spin_loop();
        }
        Err(SharedMemoryError::TornRead { attempts })
    }

    fn write_with(&self, write: impl FnOnce(&Self)) {
        let sequence = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(sequence.wrapping_add(1) | 1, Ordering::Relaxed);
        fence(Ordering::Release);
        write(self);
        self.sequence
            .store((sequence | 1).wrapping_add(1), Ordering::Release);
    }
}
