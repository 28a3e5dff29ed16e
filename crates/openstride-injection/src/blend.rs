//! The blend policy.

use openstride_config::InputMode;
use openstride_filters::clamp_unit;

/// Treadmill magnitude above which it counts as moving.
pub const ACTIVE_THRESHOLD: f32 = 0.05;

/// Two-axis input value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// Strafe, positive right
    pub x: f32,
    /// Forward, positive forward
    pub y: f32,
}

impl Vec2 {
    /// Origin.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a vector.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An input value and the host's "is the user providing input" flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    /// Value
    pub value: T,
    /// Activity flag
    pub active: bool,
}

impl<T> Sample<T> {
    /// Create a sample.
    pub const fn new(value: T, active: bool) -> Self {
        Self { value, active }
    }
}

/// Values the policy can blend.
pub trait Blendable: Copy {
    /// Whether treadmill motion of this size counts as moving.
    fn is_moving(&self, threshold: f32) -> bool;

    /// `self + other`, clamped per component to `[-1, 1]`.
    fn add_clamped(self, other: Self) -> Self;
}

impl Blendable for f32 {
    #[inline]
    fn is_moving(&self, threshold: f32) -> bool {
        self.abs() > threshold
    }

    #[inline]
    fn add_clamped(self, other: Self) -> Self {
        clamp_unit(self + other)
    }
}

impl Blendable for Vec2 {
    /// Either axis is enough; the vector magnitude is not used.
    #[inline]
    fn is_moving(&self, threshold: f32) -> bool {
        self.x.is_moving(threshold) || self.y.is_moving(threshold)
    }

    #[inline]
    fn add_clamped(self, other: Self) -> Self {
        Vec2::new(self.x.add_clamped(other.x), self.y.add_clamped(other.y))
    }
}

/// Apply `mode`, returning `None` when the host value passes through untouched.
///
/// - `Override`: always the treadmill value, always active
/// - `Additive`: clamped sum, active if either side is
/// - `Smart`: the treadmill value while moving, otherwise pass-through
#[inline]
pub fn blend_decision<T: Blendable>(
    prior: Sample<T>,
    treadmill: T,
    mode: InputMode,
    threshold: f32,
) -> Option<Sample<T>> {
    let moving = treadmill.is_moving(threshold);
    match mode {
        InputMode::Override => Some(Sample::new(treadmill, true)),
        InputMode::Additive => Some(Sample::new(
            prior.value.add_clamped(treadmill),
            prior.active || moving,
        )),
        InputMode::Smart if moving => Some(Sample::new(treadmill, true)),
        InputMode::Smart => None,
    }
}

/// [`blend_decision`] with pass-through resolved to `prior`.
#[inline]
pub fn blend<T: Blendable>(prior: Sample<T>, treadmill: T, mode: InputMode, threshold: f32) -> Sample<T> {
    blend_decision(prior, treadmill, mode, threshold).unwrap_or(prior)
}
