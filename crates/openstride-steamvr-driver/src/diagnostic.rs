//! Walking-direction diagnostic.
//!
//! Compares where the HMD actually moved with where the joystick and the
//! treadmill heading say it should have moved. It only logs; nothing is
//! corrected.

/// Frames between two comparisons.
pub const DIAGNOSTIC_INTERVAL_FRAMES: u64 = 50;
/// HMD travel below this (metres) is too small to judge.
pub const MIN_HMD_TRAVEL_M: f32 = 0.05;
/// Expected vectors shorter than this mean the user is standing still.
pub const MIN_EXPECTED_LENGTH: f32 = 0.01;
/// Deviation above which a mismatch is reported.
pub const MISMATCH_THRESHOLD_DEG: f32 = 5.0;

/// Outcome of one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionReport {
    /// Angle between the two directions, `[0, 180]`.
    pub deviation_deg: f32,
    /// Normalized HMD displacement `(x, z)`.
    pub actual: (f32, f32),
    /// Normalized expected direction `(x, z)`.
    pub expected: (f32, f32),
}

impl DirectionReport {
    /// Whether the deviation is above [`MISMATCH_THRESHOLD_DEG`].
    pub fn is_mismatch(&self) -> bool {
        self.deviation_deg > MISMATCH_THRESHOLD_DEG
    }
}

fn normalized(v: (f32, f32)) -> Option<((f32, f32), f32)> {
    let length = v.0.hypot(v.1);
    (length.is_finite() && length > 0.0).then(|| ((v.0 / length, v.1 / length), length))
}

/// Compare an HMD displacement with an expected world direction.
///
/// `None` when the HMD barely moved or nothing was expected.
pub fn compare_directions(actual_delta: (f32, f32), expected: (f32, f32)) -> Option<DirectionReport> {
    let (actual, travel) = normalized(actual_delta)?;
    if travel <= MIN_HMD_TRAVEL_M {
        return None;
    }
    let (expected, length) = normalized(expected)?;
    if length <= MIN_EXPECTED_LENGTH {
        return None;
    }
    let dot = (actual.0 * expected.0 + actual.1 * expected.1).clamp(-1.0, 1.0);
    Some(DirectionReport {
        deviation_deg: dot.acos().to_degrees(),
        actual,
        expected,
    })
}

/// Runs [`compare_directions`] every [`DIAGNOSTIC_INTERVAL_FRAMES`] frames,
/// measuring HMD travel since the previous comparison.
#[derive(Debug, Clone, Default)]
pub struct DirectionDiagnostic {
    frame: u64,
    anchor: Option<(f32, f32)>,
}

impl DirectionDiagnostic {
    /// Fresh diagnostic with no anchor.
    pub const fn new() -> Self {
        Self { frame: 0, anchor: None }
    }

    /// Advance one frame. `hmd` is the HMD's `(x, z)` when its pose is valid.
    pub fn on_frame(&mut self, hmd: Option<(f32, f32)>, expected: (f32, f32)) -> Option<DirectionReport> {
        self.frame = self.frame.wrapping_add(1);
        let hmd = hmd?;
        let Some(anchor) = self.anchor else {
            self.anchor = Some(hmd);
            return None;
        };
        if !self.frame.is_multiple_of(DIAGNOSTIC_INTERVAL_FRAMES) {
            return None;
        }
        self.anchor = Some(hmd);
        compare_directions((hmd.0 - anchor.0, hmd.1 - anchor.1), expected)
    }

    /// Frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }
}
