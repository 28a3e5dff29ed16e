//! Driver-side motion: live tunables, the driver's own smoothing and the
//! heading math shared by both devices.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use openstride_filters::{apply_smoothing, clamp_unit, normalize_yaw, smooth_yaw};
use openstride_state::MotionSnapshot;

use crate::ffi::HmdQuaternion;
use crate::settings::{DriverSettings, valid_smoothing_factor, valid_speed_factor};

/// Values the `DebugRequest` commands change while SteamVR is running.
#[derive(Debug)]
pub struct Tunables {
    speed_factor: AtomicU32,
    smoothing_factor: AtomicU32,
    debug: AtomicBool,
}

impl Tunables {
    /// Speed 1.0, smoothing 0.3, debug on.
    pub const fn new() -> Self {
        Self {
            speed_factor: AtomicU32::new(0x3F80_0000),
            smoothing_factor: AtomicU32::new(0x3E99_999A),
            debug: AtomicBool::new(true),
        }
    }

    /// Take all three values from `settings`.
    pub fn apply(&self, settings: &DriverSettings) {
        self.speed_factor.store(settings.speed_factor.to_bits(), Ordering::Relaxed);
        self.smoothing_factor.store(settings.smoothing_factor.to_bits(), Ordering::Relaxed);
        self.debug.store(settings.debug, Ordering::Relaxed);
    }

    /// Current joystick scale.
    pub fn speed_factor(&self) -> f32 {
        f32::from_bits(self.speed_factor.load(Ordering::Relaxed))
    }

    /// Current EMA coefficient.
    pub fn smoothing_factor(&self) -> f32 {
        f32::from_bits(self.smoothing_factor.load(Ordering::Relaxed))
    }

    /// Current debug flag.
    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Set the speed factor; rejects values that are not `> 0`.
    pub fn set_speed_factor(&self, value: f32) -> bool {
        if !valid_speed_factor(value) {
            return false;
        }
        self.speed_factor.store(value.to_bits(), Ordering::Relaxed);
        true
    }

    /// Set the smoothing factor; rejects values outside `[0, 1]`.
    pub fn set_smoothing_factor(&self, value: f32) -> bool {
        if !valid_smoothing_factor(value) {
            return false;
        }
        self.smoothing_factor.store(value.to_bits(), Ordering::Relaxed);
        true
    }

    /// Set the debug flag.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new()
    }
}

/// One frame's worth of treadmill input as the devices report it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverMotion {
    /// Smoothed lateral axis, before the speed factor.
    pub x: f32,
    /// Smoothed forward axis, before the speed factor.
    pub y: f32,
    /// Smoothed heading in degrees.
    pub yaw: f32,
    /// Samples folded in so far.
    pub samples: u64,
}

impl DriverMotion {
    /// Joystick values: smoothed axes scaled by `speed_factor`, clamped.
    pub fn joystick(&self, speed_factor: f32) -> (f32, f32) {
        (clamp_unit(self.x * speed_factor), clamp_unit(self.y * speed_factor))
    }
}

/// The driver's own smoothing over the runtime's samples.
///
/// Each new sample is folded in once: an EMA on both axes and the circular
/// EMA on the heading. When no live data flows the axes decay towards zero
/// and the heading holds.
#[derive(Debug, Clone, Default)]
pub struct MotionSmoother {
    motion: DriverMotion,
    last_update_count: u64,
}

impl MotionSmoother {
    /// Zeroed smoother.
    pub const fn new() -> Self {
        Self {
            motion: DriverMotion {
                x: 0.0,
                y: 0.0,
                yaw: 0.0,
                samples: 0,
            },
            last_update_count: 0,
        }
    }

    /// Fold `snapshot` in if it carries a sample not seen yet.
    pub fn update(&mut self, snapshot: &MotionSnapshot, connected: bool, alpha: f32) -> DriverMotion {
        if !connected {
            self.motion.x = apply_smoothing(self.motion.x, 0.0, alpha);
            self.motion.y = apply_smoothing(self.motion.y, 0.0, alpha);
            return self.motion;
        }
        if snapshot.update_count == self.last_update_count {
            return self.motion;
        }
        self.last_update_count = snapshot.update_count;
        self.motion.x = apply_smoothing(self.motion.x, snapshot.x, alpha);
        self.motion.y = apply_smoothing(self.motion.y, snapshot.y, alpha);
        self.motion.yaw = smooth_yaw(self.motion.yaw, snapshot.yaw, alpha);
        self.motion.samples = self.motion.samples.saturating_add(1);
        self.motion
    }

    /// Latest output.
    pub fn motion(&self) -> DriverMotion {
        self.motion
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rotation about the vertical axis for a treadmill heading.
///
/// The ring turns opposite to SteamVR's yaw, hence the negated `y`.
pub fn yaw_quaternion(yaw_deg: f32) -> HmdQuaternion {
    let half = f64::from(normalize_yaw(yaw_deg)).to_radians() * 0.5;
    let q = HmdQuaternion {
        w: half.cos(),
        x: 0.0,
        y: -half.sin(),
        z: 0.0,
    };
    let length = (q.w * q.w + q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
    if length <= 1e-4 {
        return q;
    }
    HmdQuaternion {
        w: q.w / length,
        x: q.x / length,
        y: q.y / length,
        z: q.z / length,
    }
}

/// World-space walking direction implied by the joystick and the heading,
/// as `(x, z)`.
pub fn expected_direction(joystick_x: f32, joystick_y: f32, yaw_deg: f32) -> (f32, f32) {
    let (sin, cos) = f64::from(yaw_deg).to_radians().sin_cos();
    let jx = f64::from(joystick_x);
    let jy = f64::from(joystick_y);
    ((jx * cos - jy * sin) as f32, (jx * sin + jy * cos) as f32)
}
