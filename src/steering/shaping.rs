//! Shaping behaviors
//!
//! Each behavior writes desirability into a [`ContextMap`]'s interest array
//! and touches nothing else. Behaviors are plain value types; build one per
//! tick and call [`ShapingBehavior::shape`].
//!
//! Seek uses the hard-clamped form `max(0, dot(slot, target))`: slots facing
//! away from the target get no interest at all. Every other behavior is
//! expressed through it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::context_map::ContextMap;
use super::math::{normalize_or_zero, rotate};
use super::noise_field::NoiseBank;

/// Trait for interest-shaping behaviors
pub trait ShapingBehavior {
    /// Add this behavior's interest to `map`.
    fn shape(&self, map: &mut ContextMap);
}

/// Add `max(0, dot(slot, normalize(target))) * weight` to every slot.
///
/// Zero-length targets contribute nothing.
pub fn seek(map: &mut ContextMap, target: Vec2, weight: f32) {
    let dir = normalize_or_zero(target);
    if dir == Vec2::ZERO || weight <= 0.0 {
        return;
    }
    for i in 0..map.resolution() {
        let d = map.slot(i).dot(dir);
        map.add_interest(i, d.max(0.0) * weight);
    }
}

/// Seek - interest toward a direction
#[derive(Debug, Clone, Copy)]
pub struct Seek {
    /// Direction to the target (need not be normalized)
    pub target: Vec2,
    /// Interest scale
    pub weight: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec2, weight: f32) -> Self {
        Self { target, weight }
    }
}

impl ShapingBehavior for Seek {
    fn shape(&self, map: &mut ContextMap) {
        seek(map, self.target, self.weight);
    }
}

/// Flee - interest away from a direction
#[derive(Debug, Clone, Copy)]
pub struct Flee {
    /// Direction to the threat
    pub target: Vec2,
    /// Interest scale
    pub weight: f32,
}

impl Flee {
    /// Create a new flee behavior
    #[must_use]
    pub fn new(target: Vec2, weight: f32) -> Self {
        Self { target, weight }
    }
}

impl ShapingBehavior for Flee {
    fn shape(&self, map: &mut ContextMap) {
        seek(map, -self.target, self.weight);
    }
}

/// Range band and weights for [`Strafe`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrafeParams {
    /// Closer than this the agent backs off
    pub min_range: f32,
    /// Farther than this the agent closes in
    pub max_range: f32,
    /// Seek weight used beyond `max_range`
    pub seek_weight: f32,
    /// Flee weight used inside `min_range`
    pub flee_weight: f32,
    /// Scale of the perpendicular interest inside the band
    pub strafe_weight: f32,
}

impl Default for StrafeParams {
    fn default() -> Self {
        Self {
            min_range: 3.0,
            max_range: 6.0,
            seek_weight: 1.0,
            flee_weight: 1.0,
            strafe_weight: 1.0,
        }
    }
}

/// Strafe - circle a target while holding a distance band
///
/// Outside the band this degrades to [`Seek`] or [`Flee`]. Inside, interest
/// peaks perpendicular to the target and fades as the agent nears
/// `max_range`.
#[derive(Debug, Clone, Copy)]
pub struct Strafe {
    /// Direction to the target
    pub target: Vec2,
    /// Current distance to the target
    pub distance: f32,
    /// Band and weights
    pub params: StrafeParams,
}

impl Strafe {
    /// Create a new strafe behavior
    #[must_use]
    pub fn new(target: Vec2, distance: f32, params: StrafeParams) -> Self {
        Self {
            target,
            distance,
            params,
        }
    }

    /// Perpendicular blend factor for the current distance, 0 outside the band.
    #[must_use]
    pub fn blend(&self) -> f32 {
        let StrafeParams {
            min_range,
            max_range,
            ..
        } = self.params;
        if self.distance > max_range || self.distance < min_range {
            return 0.0;
        }
        let span = max_range - min_range;
        if span <= f32::EPSILON {
            return 1.0;
        }
        ((max_range - self.distance) / span).clamp(0.0, 1.0)
    }
}

impl ShapingBehavior for Strafe {
    fn shape(&self, map: &mut ContextMap) {
        if self.distance > self.params.max_range {
            seek(map, self.target, self.params.seek_weight);
            return;
        }
        if self.distance < self.params.min_range {
            seek(map, -self.target, self.params.flee_weight);
            return;
        }

        let dir = normalize_or_zero(self.target);
        if dir == Vec2::ZERO {
            return;
        }
        let scale = self.blend() * self.params.strafe_weight;
        for i in 0..map.resolution() {
            let d = map.slot(i).dot(dir).abs();
            map.add_interest(i, (1.0 - d) * scale);
        }
    }
}

/// Knobs for [`Wander`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WanderParams {
    /// Maximum deviation from forward, radians
    pub angle_range: f32,
    /// Interest scale
    pub weight: f32,
    /// Noise seed
    pub seed: u32,
}

impl Default for WanderParams {
    fn default() -> Self {
        Self {
            angle_range: std::f32::consts::FRAC_PI_2,
            weight: 1.0,
            seed: 0,
        }
    }
}

/// Wander - seek along forward, bent by smooth noise
///
/// The noise cursor is read, never advanced: the caller moves it at its own
/// rate so sampling and advancing stay decoupled.
#[derive(Debug, Clone, Copy)]
pub struct Wander<'a> {
    /// Current heading
    pub forward: Vec2,
    /// Noise cursor to sample at
    pub cursor: f32,
    /// Range, weight and seed
    pub params: WanderParams,
    noise: &'a NoiseBank,
}

impl<'a> Wander<'a> {
    /// Create a new wander behavior
    #[must_use]
    pub fn new(forward: Vec2, cursor: f32, params: WanderParams, noise: &'a NoiseBank) -> Self {
        Self {
            forward,
            cursor,
            params,
            noise,
        }
    }

    /// Angle offset from forward at the current cursor.
    #[must_use]
    pub fn offset_angle(&self) -> f32 {
        self.noise.sample_1d(self.params.seed, self.cursor) * self.params.angle_range
    }

    /// Direction wander steers toward. Zero forward is treated as +X.
    #[must_use]
    pub fn heading(&self) -> Vec2 {
        let mut forward = normalize_or_zero(self.forward);
        if forward == Vec2::ZERO {
            forward = Vec2::X;
        }
        rotate(forward, self.offset_angle())
    }
}

impl ShapingBehavior for Wander<'_> {
    fn shape(&self, map: &mut ContextMap) {
        seek(map, self.heading(), self.params.weight);
    }
}

/// Tether - pull back toward home once outside a leash
#[derive(Debug, Clone, Copy)]
pub struct Tether {
    /// Agent position
    pub position: Vec2,
    /// Anchor point
    pub home: Vec2,
    /// Free radius around home
    pub leash_radius: f32,
    /// Interest scale per leash length of overshoot
    pub weight: f32,
}

impl Tether {
    /// Create a new tether behavior
    #[must_use]
    pub fn new(position: Vec2, home: Vec2, leash_radius: f32, weight: f32) -> Self {
        debug_assert!(leash_radius >= 0.0, "negative leash radius {leash_radius}");
        Self {
            position,
            home,
            leash_radius,
            weight,
        }
    }

    /// Pull strength: `(distance - leash) / leash * weight`, 0 inside the leash.
    #[must_use]
    pub fn strength(&self) -> f32 {
        let distance = self.position.distance(self.home);
        let leash = self.leash_radius.max(0.0);
        if distance <= leash {
            return 0.0;
        }
        // A zero leash would divide by zero; treat it as one unit
        let scale = if leash > f32::EPSILON { leash } else { 1.0 };
        (distance - leash) / scale * self.weight
    }
}

impl ShapingBehavior for Tether {
    fn shape(&self, map: &mut ContextMap) {
        let strength = self.strength();
        if strength > 0.0 {
            seek(map, self.home - self.position, strength);
        }
    }
}

/// Path lock - single-slot interest spike toward a confirmed-clear direction
///
/// Only build this after a line-of-sight check passes. The pipeline pairs it
/// with winner-take-all solving so a clear corridor resolves to its exact
/// slot instead of an interpolated blend.
#[derive(Debug, Clone, Copy)]
pub struct PathLock {
    /// Direction of the clear corridor
    pub direction: Vec2,
    /// Interest added to the nearest slot
    pub boost: f32,
}

impl PathLock {
    /// Create a new path lock
    #[must_use]
    pub fn new(direction: Vec2, boost: f32) -> Self {
        Self { direction, boost }
    }
}

impl ShapingBehavior for PathLock {
    fn shape(&self, map: &mut ContextMap) {
        if normalize_or_zero(self.direction) == Vec2::ZERO {
            return;
        }
        let slot = map.closest_slot(self.direction);
        map.add_interest(slot, self.boost);
    }
}
