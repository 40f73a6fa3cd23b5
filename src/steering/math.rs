//! 2D vector helpers shared by every steering stage.
//!
//! Everything here is a thin layer over `glam::Vec2`. The only rule the rest
//! of the crate relies on: no function in this module ever produces NaN from
//! a zero-length input.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

/// Tolerance used for "effectively zero" comparisons across the crate.
pub const EPSILON: f32 = 1e-6;

/// Normalize `v`, returning `Vec2::ZERO` for zero-length or non-finite input.
#[inline]
#[must_use]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}

/// Unit vector pointing along `angle` (radians, counter-clockwise from +X).
#[inline]
#[must_use]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::from_angle(angle)
}

/// Angle of `v` in radians, in (-π, π]. Zero vector maps to 0.
#[inline]
#[must_use]
pub fn angle_of(v: Vec2) -> f32 {
    if v.length_squared() <= EPSILON * EPSILON {
        return 0.0;
    }
    v.y.atan2(v.x)
}

/// Rotate `v` counter-clockwise by `angle` radians.
#[inline]
#[must_use]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Z component of the 3D cross product. Positive when `b` is
/// counter-clockwise from `a`.
#[inline]
#[must_use]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Wrap an angle into (-π, π].
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed shortest-arc difference `to - from`, in (-π, π].
#[inline]
#[must_use]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Interpolate between two angles along the shortest arc.
#[inline]
#[must_use]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + angle_delta(from, to) * t)
}

/// Framerate-independent exponential smoothing factor `1 - e^(-rate·dt)`.
///
/// Non-positive rate or dt yields 0 (no movement toward the target).
#[inline]
#[must_use]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    if rate <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}
