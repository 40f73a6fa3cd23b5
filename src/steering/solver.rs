//! Context map solver
//!
//! Turns a shaped and sensed [`ContextMap`] into one direction and a
//! confidence magnitude. Interest is first masked by danger, then either the
//! best slot is taken verbatim ([`SolveMode::WinnerTakeAll`]) or a parabola
//! through the peak and its two neighbours recovers a heading between slots
//! ([`SolveMode::Interpolated`]).
//!
//! A magnitude of zero means nothing survived the mask. Callers hold or
//! decelerate; it is not an error.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::context_map::ContextMap;
use super::math::{EPSILON, from_angle};

/// Default danger above which a slot is unusable regardless of interest.
pub const DEFAULT_HARD_MASK: f32 = 0.85;

/// How the peak slot becomes a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolveMode {
    /// Exact direction of the best slot
    WinnerTakeAll,
    /// Parabolic sub-slot refinement around the best slot
    #[default]
    Interpolated,
}

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Peak selection mode
    pub mode: SolveMode,
    /// Slots with danger above this are zeroed; `None` disables the clamp
    pub hard_mask: Option<f32>,
    /// Masked values at or below this count as nothing
    pub epsilon: f32,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            mode: SolveMode::Interpolated,
            hard_mask: Some(DEFAULT_HARD_MASK),
            epsilon: EPSILON,
        }
    }
}

/// Result of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Unit heading, or zero when holding
    pub direction: Vec2,
    /// Masked interest at the peak slot
    pub magnitude: f32,
    /// Peak slot, `None` when holding
    pub slot: Option<usize>,
    /// Sub-slot offset in [-0.5, 0.5], in slot widths
    pub offset: f32,
}

impl Solution {
    /// Nothing cleared the mask.
    pub const HOLD: Self = Self {
        direction: Vec2::ZERO,
        magnitude: 0.0,
        slot: None,
        offset: 0.0,
    };

    /// Whether this is a hold result.
    #[must_use]
    pub fn is_hold(&self) -> bool {
        self.slot.is_none()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::HOLD
    }
}

/// Index of the largest value, lowest index on ties. `None` when every value
/// is at or below `epsilon`.
#[must_use]
pub fn peak_index(values: &[f32], epsilon: f32) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some(b) if v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best.filter(|&b| values[b] > epsilon)
}

/// Vertex offset of the parabola through `(-1, left)`, `(0, center)`,
/// `(1, right)`, clamped to [-0.5, 0.5].
///
/// A flat top (zero curvature) yields 0.
#[must_use]
pub fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denominator = left - 2.0 * center + right;
    if denominator.abs() <= EPSILON {
        return 0.0;
    }
    let offset = (left - right) / (2.0 * denominator);
    if offset.is_finite() {
        offset.clamp(-0.5, 0.5)
    } else {
        0.0
    }
}

/// Solve an already masked array against `map`'s slot layout.
#[must_use]
pub fn solve_masked(map: &ContextMap, masked: &[f32], params: &SolverParams) -> Solution {
    debug_assert_eq!(masked.len(), map.resolution());
    let Some(center) = peak_index(masked, params.epsilon) else {
        return Solution::HOLD;
    };
    let magnitude = masked[center];

    match params.mode {
        SolveMode::WinnerTakeAll => Solution {
            direction: map.slot(center),
            magnitude,
            slot: Some(center),
            offset: 0.0,
        },
        SolveMode::Interpolated => {
            let n = center as isize;
            let left = masked[map.wrap_index(n - 1)];
            let right = masked[map.wrap_index(n + 1)];
            let offset = parabolic_offset(left, magnitude, right);
            let angle = map.slot_angle(center) + offset * map.slot_step();
            Solution {
                direction: from_angle(angle),
                magnitude,
                slot: Some(center),
                offset,
            }
        }
    }
}

/// Mask `map` and solve it.
#[must_use]
pub fn solve(map: &ContextMap, params: &SolverParams) -> Solution {
    let masked = map.masked(params.hard_mask);
    solve_masked(map, &masked, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steering::shaping::seek;
    use proptest::prelude::*;

    #[test]
    fn test_seek_slot_zero_scenario() {
        let mut map = ContextMap::new(8);
        seek(&mut map, Vec2::X, 1.0);
        let solution = solve(&map, &SolverParams::default());

        assert!((solution.direction - Vec2::X).length() < 1e-4);
        assert!((solution.magnitude - 1.0).abs() < 1e-5);
        assert_eq!(solution.slot, Some(0));
    }

    #[test]
    fn test_empty_map_holds() {
        let map = ContextMap::new(8);
        for mode in [SolveMode::WinnerTakeAll, SolveMode::Interpolated] {
            let params = SolverParams {
                mode,
                ..Default::default()
            };
            let solution = solve(&map, &params);
            assert!(solution.is_hold());
            assert_eq!(solution.magnitude, 0.0);
            assert_eq!(solution.direction, Vec2::ZERO);
        }
    }

    #[test]
    fn test_full_danger_holds() {
        let mut map = ContextMap::new(8);
        seek(&mut map, Vec2::X, 1.0);
        for i in 0..8 {
            map.write_danger(i, 1.0);
        }
        assert!(solve(&map, &SolverParams::default()).is_hold());
    }

    #[test]
    fn test_hard_mask_overrides_interest() {
        let mut map = ContextMap::new(8);
        map.add_interest(0, 100.0);
        map.add_interest(2, 1.0);
        map.write_danger(0, 0.9);
        let solution = solve(&map, &SolverParams::default());
        assert_eq!(solution.slot, Some(2));

        let unclamped = SolverParams {
            hard_mask: None,
            ..Default::default()
        };
        assert_eq!(solve(&map, &unclamped).slot, Some(0));
    }

    #[test]
    fn test_interpolation_between_slots() {
        let mut map = ContextMap::new(8);
        // Target halfway between slot 0 and slot 1 (22.5°)
        let target = from_angle(std::f32::consts::PI / 8.0);
        seek(&mut map, target, 1.0);
        let solution = solve(&map, &SolverParams::default());

        let angle = solution.direction.y.atan2(solution.direction.x);
        assert!(angle > 0.0 && angle < std::f32::consts::FRAC_PI_4);

        let wta = SolverParams {
            mode: SolveMode::WinnerTakeAll,
            ..Default::default()
        };
        let snapped = solve(&map, &wta);
        assert_eq!(snapped.offset, 0.0);
        assert!(snapped.direction == map.slot(0) || snapped.direction == map.slot(1));
    }

    #[test]
    fn test_interpolation_wraps() {
        let mut map = ContextMap::new(8);
        map.add_interest(0, 1.0);
        map.add_interest(7, 0.8);
        map.add_interest(1, 0.2);
        let solution = solve(&map, &SolverParams::default());
        assert_eq!(solution.slot, Some(0));
        // Pulled toward slot 7, i.e. negative angle
        assert!(solution.offset < 0.0);
        assert!(solution.direction.y < 0.0);
    }

    #[test]
    fn test_flat_top_zero_offset() {
        assert_eq!(parabolic_offset(1.0, 1.0, 1.0), 0.0);
        assert_eq!(parabolic_offset(0.0, 0.0, 0.0), 0.0);
        assert_eq!(parabolic_offset(0.5, 1.0, 0.5), 0.0);
    }

    #[test]
    fn test_peak_index_ties_low() {
        assert_eq!(peak_index(&[0.0, 2.0, 2.0, 1.0], EPSILON), Some(1));
        assert_eq!(peak_index(&[0.0, 0.0], EPSILON), None);
        assert_eq!(peak_index(&[f32::NAN, 0.5], EPSILON), Some(1));
    }

    proptest! {
        #[test]
        fn offset_always_bounded(l in 0.0f32..100.0, c in 0.0f32..100.0, r in 0.0f32..100.0) {
            let offset = parabolic_offset(l, c, r);
            prop_assert!((-0.5..=0.5).contains(&offset));
        }

        #[test]
        fn modes_agree_on_center(values in prop::collection::vec(0.0f32..10.0, 3..=64)) {
            let mut map = ContextMap::new(values.len());
            for (i, v) in values.iter().enumerate() {
                map.add_interest(i, *v);
            }
            let masked = map.masked(None);
            let interpolated = solve_masked(&map, &masked, &SolverParams::default());
            let wta = solve_masked(&map, &masked, &SolverParams {
                mode: SolveMode::WinnerTakeAll,
                ..Default::default()
            });
            prop_assert_eq!(interpolated.slot, wta.slot);
            prop_assert_eq!(interpolated.magnitude, wta.magnitude);
            prop_assert!((-0.5..=0.5).contains(&interpolated.offset));
        }
    }
}
