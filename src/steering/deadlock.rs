//! Deadlock resolution
//!
//! When the slot nearest the goal is blocked by an obstacle sitting squarely
//! in the way, interest on both flanks is symmetric and the solver can flip
//! between them every tick. The resolver picks a side once, biases the flank
//! on that side, and keeps the choice until the goal slot clears.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::context_map::ContextMap;
use super::math::{EPSILON, cross, normalize_or_zero};

/// Persisted tie-break side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TurnSide {
    /// Go around to the right (negative slot offsets)
    Clockwise,
    /// No deadlock in progress
    #[default]
    None,
    /// Go around to the left (positive slot offsets)
    CounterClockwise,
}

impl TurnSide {
    /// Side as -1, 0 or +1.
    #[must_use]
    pub fn sign(self) -> i8 {
        match self {
            Self::Clockwise => -1,
            Self::None => 0,
            Self::CounterClockwise => 1,
        }
    }

    /// Side for a signed value. Zero maps to [`TurnSide::None`].
    #[must_use]
    pub fn from_sign(value: f32) -> Self {
        if value > 0.0 {
            Self::CounterClockwise
        } else if value < 0.0 {
            Self::Clockwise
        } else {
            Self::None
        }
    }

    /// Whether a side has been chosen.
    #[must_use]
    pub fn is_engaged(self) -> bool {
        self != Self::None
    }
}

/// Side used when forward and goal are exactly collinear.
pub const TIE_BREAK_SIDE: TurnSide = TurnSide::CounterClockwise;

/// Resolver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlockParams {
    /// Goal-slot danger at or above which the resolver engages
    pub threshold: f32,
    /// Interest injected into each flank slot
    pub bias: f32,
}

impl Default for DeadlockParams {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            bias: 0.5,
        }
    }
}

/// Slot offsets (in the positive direction) covering the 45°–90° flank.
///
/// Yields 2–4 offsets at common resolutions and at least one at coarse ones.
#[must_use]
pub fn flank_offsets(resolution: usize) -> SmallVec<[usize; 4]> {
    let lo = (resolution as f32 / 8.0).round().max(1.0) as usize;
    let hi = (resolution / 4).max(lo);
    // Never reach the slot directly opposite the goal
    let hi = hi.min(resolution.saturating_sub(1) / 2).max(lo);
    (lo..=hi).take(4).collect()
}

/// Break symmetric blockage toward `target_dir`.
///
/// Returns the side to persist. [`TurnSide::None`] means the goal slot is
/// clear (or there is no goal) and any stored side should be dropped.
pub fn resolve_deadlock(
    map: &mut ContextMap,
    forward: Vec2,
    target_dir: Vec2,
    params: &DeadlockParams,
    persisted: TurnSide,
) -> TurnSide {
    let target = normalize_or_zero(target_dir);
    if target == Vec2::ZERO {
        return TurnSide::None;
    }

    let target_slot = map.closest_slot(target);
    if map.danger()[target_slot] < params.threshold {
        return TurnSide::None;
    }

    let side = if persisted.is_engaged() {
        persisted
    } else {
        let c = cross(normalize_or_zero(forward), target);
        if c.abs() <= EPSILON {
            TIE_BREAK_SIDE
        } else {
            TurnSide::from_sign(c)
        }
    };

    let sign = side.sign() as isize;
    for offset in flank_offsets(map.resolution()) {
        let slot = map.wrap_index(target_slot as isize + sign * offset as isize);
        map.add_interest(slot, params.bias);
    }
    side
}
