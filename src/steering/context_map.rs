//! Per-tick context map: N evenly spaced directions, each with an interest
//! and a danger scalar.
//!
//! # Invariants
//!
//! - `slots`, `interest` and `danger` always share length N (3..=64)
//! - slot `i` is the unit vector at angle `2πi / N`
//! - interest is additive and never negative
//! - danger is max-combined and always within [0, 1]
//!
//! Maps are built fresh (or [`reset`](ContextMap::reset)) for every
//! evaluation and never carried across ticks.

use std::f32::consts::TAU;

use glam::Vec2;

use super::math::{from_angle, normalize_or_zero};

/// Smallest supported resolution.
pub const MIN_RESOLUTION: usize = 3;
/// Largest supported resolution.
pub const MAX_RESOLUTION: usize = 64;

/// Directional interest/danger map.
#[derive(Debug, Clone)]
pub struct ContextMap {
    /// Precomputed unit directions
    slots: Vec<Vec2>,
    /// Additive desirability per slot
    interest: Vec<f32>,
    /// Max-combined obstruction per slot
    danger: Vec<f32>,
}

impl ContextMap {
    /// Build a map with `resolution` slots.
    ///
    /// Resolutions outside 3..=64 are a caller bug: they assert in debug
    /// builds and are clamped in release builds.
    #[must_use]
    pub fn new(resolution: usize) -> Self {
        debug_assert!(
            (MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution),
            "context map resolution {resolution} outside {MIN_RESOLUTION}..={MAX_RESOLUTION}"
        );
        let n = resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        let step = TAU / n as f32;
        let slots = (0..n).map(|i| from_angle(step * i as f32)).collect();

        Self {
            slots,
            interest: vec![0.0; n],
            danger: vec![0.0; n],
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> usize {
        self.slots.len()
    }

    /// Angular width of one slot in radians.
    #[inline]
    #[must_use]
    pub fn slot_step(&self) -> f32 {
        TAU / self.resolution() as f32
    }

    /// Angle of slot `i` in radians.
    #[inline]
    #[must_use]
    pub fn slot_angle(&self, i: usize) -> f32 {
        self.slot_step() * (i % self.resolution()) as f32
    }

    /// Unit direction of slot `i` (index wraps).
    #[inline]
    #[must_use]
    pub fn slot(&self, i: usize) -> Vec2 {
        self.slots[i % self.resolution()]
    }

    /// All slot directions.
    #[must_use]
    pub fn slots(&self) -> &[Vec2] {
        &self.slots
    }

    /// Interest values.
    #[must_use]
    pub fn interest(&self) -> &[f32] {
        &self.interest
    }

    /// Danger values.
    #[must_use]
    pub fn danger(&self) -> &[f32] {
        &self.danger
    }

    /// Zero interest and danger, keeping the slot table.
    pub fn reset(&mut self) {
        self.interest.fill(0.0);
        self.danger.fill(0.0);
    }

    /// Wrap a possibly negative slot offset into `0..N`.
    #[inline]
    #[must_use]
    pub fn wrap_index(&self, i: isize) -> usize {
        i.rem_euclid(self.resolution() as isize) as usize
    }

    /// Index of the slot best aligned with `dir`.
    ///
    /// Ties resolve to the lowest index. A zero-length `dir` returns slot 0.
    #[must_use]
    pub fn closest_slot(&self, dir: Vec2) -> usize {
        let dir = normalize_or_zero(dir);
        if dir == Vec2::ZERO {
            return 0;
        }

        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, slot) in self.slots.iter().enumerate() {
            let d = slot.dot(dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }

    /// Add to slot `i`'s interest. Negative and non-finite amounts are ignored.
    #[inline]
    pub fn add_interest(&mut self, i: usize, amount: f32) {
        if amount > 0.0 && amount.is_finite() {
            let n = self.resolution();
            self.interest[i % n] += amount;
        }
    }

    /// Max-combine `value` into slot `i`'s danger, clamped to [0, 1].
    #[inline]
    pub fn write_danger(&mut self, i: usize, value: f32) {
        if value.is_nan() {
            return;
        }
        let n = self.resolution();
        let slot = &mut self.danger[i % n];
        *slot = slot.max(value.clamp(0.0, 1.0));
    }

    /// Mutable danger values, used by the dilation pass.
    pub(crate) fn danger_mut(&mut self) -> &mut [f32] {
        &mut self.danger
    }

    /// Interest with danger applied: `interest * (1 - min(1, danger))`.
    ///
    /// When `hard_mask` is set, slots whose danger exceeds it are zeroed
    /// regardless of interest.
    #[must_use]
    pub fn masked(&self, hard_mask: Option<f32>) -> Vec<f32> {
        self.interest
            .iter()
            .zip(&self.danger)
            .map(|(&interest, &danger)| match hard_mask {
                Some(limit) if danger > limit => 0.0,
                _ => interest * (1.0 - danger.min(1.0)),
            })
            .collect()
    }
}
