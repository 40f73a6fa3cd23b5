//! Danger sensing against circular obstacles
//!
//! Two sensors fill a [`ContextMap`]'s danger array:
//!
//! - [`sense`] casts one ray per slot and converts the nearest hit into
//!   danger with a configurable falloff
//! - [`sense_proximity`] skips raycasting and stamps each nearby obstacle
//!   into its nearest slot, for cheap low-LOD agents
//!
//! Both finish with [`dilate`], which spreads danger to neighbouring slots so
//! a thin ray fan still respects the width of the agent and the obstacle.
//! Danger is always max-combined, so every value stays within [0, 1].

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::context_map::ContextMap;
use super::math::normalize_or_zero;

/// A circular obstacle in the shared per-tick snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// World-space center
    pub center: Vec2,
    /// Radius (must be non-negative)
    pub radius: f32,
    /// Optional filter tag, matched against [`SensorParams::exclude_tag`]
    #[serde(default)]
    pub tag: Option<u32>,
}

impl Obstacle {
    /// Create an untagged obstacle.
    #[must_use]
    pub fn new(center: Vec2, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative obstacle radius {radius}");
        Self {
            center,
            radius,
            tag: None,
        }
    }

    /// Attach a filter tag.
    #[must_use]
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = Some(tag);
        self
    }

    fn excluded_by(&self, exclude: Option<u32>) -> bool {
        exclude.is_some() && self.tag == exclude
    }
}

/// How a hit's gap maps to danger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DangerFalloff {
    /// `1 - t`
    Linear,
    /// `1 - t²`
    #[default]
    Quadratic,
    /// `1 - t⁴`, a hard shell that stays near 1 until the far end
    Steep,
}

impl DangerFalloff {
    /// Danger for a normalized gap `t = gap / range`.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => 1.0 - t,
            Self::Quadratic => 1.0 - t * t,
            Self::Steep => 1.0 - (t * t) * (t * t),
        }
    }
}

/// Sensor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    /// Maximum ray length
    pub range: f32,
    /// Agent body radius, subtracted from hit distances
    pub agent_radius: f32,
    /// Gap → danger curve for raycasts
    pub falloff: DangerFalloff,
    /// Danger below this does not dilate
    pub dilation_epsilon: f32,
    /// Half-angle of the dilation window at danger 1.0, radians
    pub dilation_half_angle: f32,
    /// Scale applied to spread danger
    pub dilation_attenuation: f32,
    /// Obstacles carrying this tag are ignored
    pub exclude_tag: Option<u32>,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            range: 5.0,
            agent_radius: 0.5,
            falloff: DangerFalloff::Quadratic,
            dilation_epsilon: 0.05,
            dilation_half_angle: std::f32::consts::FRAC_PI_4,
            dilation_attenuation: 0.8,
            exclude_tag: None,
        }
    }
}

/// One slot's nearest obstacle hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// Slot the ray was cast along
    pub slot: usize,
    /// Distance from the agent center to the obstacle surface
    pub distance: f32,
    /// Index of the obstacle in the snapshot
    pub obstacle: usize,
    /// Danger written for this slot before dilation
    pub danger: f32,
    /// Ray angle in radians
    pub angle: f32,
}

/// Hits from one sensing pass.
pub type RayHits = SmallVec<[RayHit; 16]>;

/// Distance along a unit ray to the first intersection with a circle.
///
/// Returns 0 when `origin` starts inside the circle. `dir` must be unit
/// length.
#[must_use]
pub fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let m = origin - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = m.dot(dir);
    if b > 0.0 {
        // Outside and pointing away
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    Some(t.max(0.0))
}

/// Nearest obstacle along a ray within `range`: `(distance, obstacle index)`.
#[must_use]
pub fn raycast(
    origin: Vec2,
    dir: Vec2,
    range: f32,
    obstacles: &[Obstacle],
    exclude_tag: Option<u32>,
) -> Option<(f32, usize)> {
    let dir = normalize_or_zero(dir);
    if dir == Vec2::ZERO || range <= 0.0 {
        return None;
    }

    let mut nearest: Option<(f32, usize)> = None;
    for (index, obstacle) in obstacles.iter().enumerate() {
        if obstacle.excluded_by(exclude_tag) {
            continue;
        }
        let Some(t) = ray_circle(origin, dir, obstacle.center, obstacle.radius.max(0.0)) else {
            continue;
        };
        if t > range {
            continue;
        }
        if nearest.is_none_or(|(best, _)| t < best) {
            nearest = Some((t, index));
        }
    }
    nearest
}

/// Danger for a hit at `distance` along a ray.
#[must_use]
pub fn hit_danger(distance: f32, params: &SensorParams) -> f32 {
    if params.range <= 0.0 {
        return 0.0;
    }
    let gap = (distance - params.agent_radius).max(0.0);
    params.falloff.apply(gap / params.range)
}

/// Raycast every slot, write danger, then dilate. Returns the raw hits.
pub fn sense(
    map: &mut ContextMap,
    position: Vec2,
    obstacles: &[Obstacle],
    params: &SensorParams,
) -> RayHits {
    let mut hits = RayHits::new();
    if params.range <= 0.0 || obstacles.is_empty() {
        return hits;
    }

    for slot in 0..map.resolution() {
        let dir = map.slot(slot);
        let Some((distance, obstacle)) =
            raycast(position, dir, params.range, obstacles, params.exclude_tag)
        else {
            continue;
        };
        let danger = hit_danger(distance, params);
        map.write_danger(slot, danger);
        hits.push(RayHit {
            slot,
            distance,
            obstacle,
            danger,
            angle: map.slot_angle(slot),
        });
    }

    dilate(map, params);
    hits
}

/// Proximity-only sensing for low-LOD agents.
///
/// Every obstacle whose surface lies within `range` of the agent's body
/// writes `1 - t²` into the slot nearest its center, then the usual dilation
/// pass runs. An agent centered exactly on an obstacle center marks slot 0.
pub fn sense_proximity(
    map: &mut ContextMap,
    position: Vec2,
    obstacles: &[Obstacle],
    params: &SensorParams,
) {
    if params.range <= 0.0 {
        return;
    }
    for obstacle in obstacles {
        if obstacle.excluded_by(params.exclude_tag) {
            continue;
        }
        let offset = obstacle.center - position;
        let gap = (offset.length() - obstacle.radius.max(0.0) - params.agent_radius).max(0.0);
        if gap > params.range {
            continue;
        }
        let t = gap / params.range;
        let slot = map.closest_slot(offset);
        map.write_danger(slot, 1.0 - t * t);
    }
    dilate(map, params);
}

/// Re-write cached hits into a fresh map and dilate.
///
/// Used on throttled ticks where sensing is skipped. Hits recorded at a
/// different resolution are ignored.
pub fn apply_cached(map: &mut ContextMap, hits: &[RayHit], params: &SensorParams) {
    let n = map.resolution();
    for hit in hits.iter().filter(|hit| hit.slot < n) {
        map.write_danger(hit.slot, hit.danger);
    }
    dilate(map, params);
}

/// Spread each slot's danger to its angular neighbours.
///
/// The window half-angle is `danger * dilation_half_angle`, so nearer
/// obstacles block a wider arc. Any slot above `dilation_epsilon` reaches at
/// least its direct neighbours; a zero half-angle disables dilation. Spread
/// values fall off linearly with slot distance and are max-combined, so no
/// slot ever loses danger.
pub fn dilate(map: &mut ContextMap, params: &SensorParams) {
    if params.dilation_half_angle <= 0.0 {
        return;
    }
    let n = map.resolution();
    let step = map.slot_step();
    let source: SmallVec<[f32; 64]> = map.danger().iter().copied().collect();
    let danger = map.danger_mut();

    for (i, &value) in source.iter().enumerate() {
        if value <= params.dilation_epsilon {
            continue;
        }
        let half_angle = value * params.dilation_half_angle;
        let reach = ((half_angle / step).ceil() as usize).clamp(1, (n / 2).max(1));
        for k in 1..=reach {
            let falloff = 1.0 - k as f32 / (reach + 1) as f32;
            let spread = (value * params.dilation_attenuation * falloff).clamp(0.0, 1.0);
            for j in [(i + k) % n, (i + n - k) % n] {
                if spread > danger[j] {
                    danger[j] = spread;
                }
            }
        }
    }
}

/// Whether the segment `from → to` clears every obstacle by `clearance`.
#[must_use]
pub fn has_line_of_sight(
    from: Vec2,
    to: Vec2,
    clearance: f32,
    obstacles: &[Obstacle],
    exclude_tag: Option<u32>,
) -> bool {
    let segment = to - from;
    let length = segment.length();
    let Some(dir) = segment.try_normalize() else {
        return true;
    };

    obstacles
        .iter()
        .filter(|obstacle| !obstacle.excluded_by(exclude_tag))
        .all(|obstacle| {
            let radius = obstacle.radius.max(0.0) + clearance.max(0.0);
            match ray_circle(from, dir, obstacle.center, radius) {
                Some(t) => t > length,
                None => true,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn no_dilation() -> SensorParams {
        SensorParams {
            dilation_half_angle: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_ray_circle_hit_and_miss() {
        let t = ray_circle(Vec2::ZERO, Vec2::X, Vec2::new(5.0, 0.0), 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(ray_circle(Vec2::ZERO, -Vec2::X, Vec2::new(5.0, 0.0), 1.0).is_none());
        assert!(ray_circle(Vec2::ZERO, Vec2::Y, Vec2::new(5.0, 0.0), 1.0).is_none());
        assert_eq!(ray_circle(Vec2::ZERO, Vec2::X, Vec2::ZERO, 1.0), Some(0.0));
    }

    #[test]
    fn test_raycast_nearest_wins() {
        let obstacles = [
            Obstacle::new(Vec2::new(8.0, 0.0), 1.0),
            Obstacle::new(Vec2::new(4.0, 0.0), 1.0),
        ];
        let (distance, index) = raycast(Vec2::ZERO, Vec2::X, 10.0, &obstacles, None).unwrap();
        assert_eq!(index, 1);
        assert!((distance - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_raycast_respects_range_and_filter() {
        let obstacles = [Obstacle::new(Vec2::new(4.0, 0.0), 1.0).with_tag(7)];
        assert!(raycast(Vec2::ZERO, Vec2::X, 2.0, &obstacles, None).is_none());
        assert!(raycast(Vec2::ZERO, Vec2::X, 10.0, &obstacles, Some(7)).is_none());
        assert!(raycast(Vec2::ZERO, Vec2::X, 10.0, &obstacles, Some(3)).is_some());
    }

    #[test]
    fn test_contact_is_full_danger() {
        let params = SensorParams {
            agent_radius: 2.0,
            ..Default::default()
        };
        for falloff in [
            DangerFalloff::Linear,
            DangerFalloff::Quadratic,
            DangerFalloff::Steep,
        ] {
            let params = SensorParams { falloff, ..params };
            assert_eq!(hit_danger(2.0, &params), 1.0);
            assert_eq!(hit_danger(0.5, &params), 1.0);
            assert_eq!(hit_danger(2.0 + params.range, &params), 0.0);
        }
    }

    #[test]
    fn test_falloff_ordering() {
        let t = 0.5;
        let linear = DangerFalloff::Linear.apply(t);
        let quadratic = DangerFalloff::Quadratic.apply(t);
        let steep = DangerFalloff::Steep.apply(t);
        assert!(linear < quadratic && quadratic < steep);
    }

    #[test]
    fn test_sense_no_obstacles() {
        let mut map = ContextMap::new(8);
        let hits = sense(&mut map, Vec2::ZERO, &[], &SensorParams::default());
        assert!(hits.is_empty());
        assert!(map.danger().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_sense_obstacle_ahead() {
        let mut map = ContextMap::new(8);
        let obstacles = [Obstacle::new(Vec2::new(2.0, 0.0), 0.5)];
        let hits = sense(&mut map, Vec2::ZERO, &obstacles, &no_dilation());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slot, 0);
        assert_eq!(hits[0].obstacle, 0);
        // gap = 1.5 - 0.5 = 1.0, t = 0.2, quadratic → 0.96
        assert!((map.danger()[0] - 0.96).abs() < 1e-4);
        assert_eq!(map.danger()[4], 0.0);
    }

    #[test]
    fn test_dilation_spreads_with_max() {
        let params = SensorParams {
            dilation_half_angle: std::f32::consts::FRAC_PI_2,
            dilation_attenuation: 1.0,
            ..Default::default()
        };
        let mut map = ContextMap::new(16);
        map.write_danger(0, 1.0);
        map.write_danger(5, 0.9);
        let before: Vec<f32> = map.danger().to_vec();
        dilate(&mut map, &params);

        assert!(map.danger()[1] > 0.0);
        assert!(map.danger()[15] > 0.0);
        assert!((map.danger()[1] - map.danger()[15]).abs() < 1e-6);
        for (after, before) in map.danger().iter().zip(&before) {
            assert!(after >= before);
            assert!(*after <= 1.0);
        }
    }

    #[test]
    fn test_dilation_reaches_neighbours_on_coarse_map() {
        let params = SensorParams::default();
        let mut map = ContextMap::new(8);
        map.write_danger(0, 0.9);
        dilate(&mut map, &params);

        let danger = map.danger();
        assert_eq!(danger[0], 0.9);
        assert!(danger[1] > 0.0);
        assert!(danger[7] > 0.0);
        assert!((danger[1] - danger[7]).abs() < 1e-6);
        assert!(danger[1] < 0.9);
        assert_eq!(danger[2], 0.0);
        assert_eq!(danger[4], 0.0);
    }

    #[test]
    fn test_dilation_window_grows_with_danger() {
        let params = SensorParams::default();
        let spread = |value: f32| {
            let mut map = ContextMap::new(16);
            map.write_danger(0, value);
            dilate(&mut map, &params);
            map.danger().iter().filter(|&&d| d > 0.0).count()
        };
        assert_eq!(spread(0.3), 3);
        assert_eq!(spread(0.9), 5);
    }

    #[test]
    fn test_sense_ahead_dilates_on_coarse_map() {
        let mut map = ContextMap::new(8);
        let obstacles = [Obstacle::new(Vec2::new(2.0, 0.0), 0.5)];
        sense(&mut map, Vec2::ZERO, &obstacles, &SensorParams::default());
        assert!(map.danger()[1] > 0.0);
        assert!(map.danger()[7] > 0.0);
    }

    #[test]
    fn test_dilation_ignores_faint_danger() {
        let params = SensorParams::default();
        let mut map = ContextMap::new(16);
        map.write_danger(3, params.dilation_epsilon * 0.5);
        dilate(&mut map, &params);
        assert_eq!(map.danger().iter().filter(|&&d| d > 0.0).count(), 1);
    }

    #[test]
    fn test_sense_proximity() {
        let mut map = ContextMap::new(8);
        let obstacles = [
            Obstacle::new(Vec2::new(0.0, 2.0), 0.5),
            Obstacle::new(Vec2::new(50.0, 0.0), 0.5),
        ];
        sense_proximity(&mut map, Vec2::ZERO, &obstacles, &no_dilation());
        assert!(map.danger()[2] > 0.9);
        assert_eq!(map.danger()[0], 0.0);
    }

    #[test]
    fn test_apply_cached_matches_fresh() {
        let params = SensorParams::default();
        let obstacles = [Obstacle::new(Vec2::new(2.0, 1.0), 0.7)];

        let mut fresh = ContextMap::new(16);
        let hits = sense(&mut fresh, Vec2::ZERO, &obstacles, &params);

        let mut cached = ContextMap::new(16);
        apply_cached(&mut cached, &hits, &params);
        assert_eq!(fresh.danger(), cached.danger());
    }

    #[test]
    fn test_line_of_sight() {
        let obstacles = [Obstacle::new(Vec2::new(5.0, 0.0), 1.0)];
        assert!(!has_line_of_sight(Vec2::ZERO, Vec2::new(10.0, 0.0), 0.0, &obstacles, None));
        assert!(has_line_of_sight(Vec2::ZERO, Vec2::new(3.0, 0.0), 0.0, &obstacles, None));
        assert!(has_line_of_sight(Vec2::ZERO, Vec2::new(0.0, 10.0), 0.5, &obstacles, None));
        // Passing 1.5 from the center clears a radius-1 circle, but not with clearance 1
        assert!(has_line_of_sight(
            Vec2::new(0.0, 1.5),
            Vec2::new(10.0, 1.5),
            0.0,
            &obstacles,
            None
        ));
        assert!(!has_line_of_sight(
            Vec2::new(0.0, 1.5),
            Vec2::new(10.0, 1.5),
            1.0,
            &obstacles,
            None
        ));
    }

    proptest! {
        #[test]
        fn dilation_is_monotonic(
            values in prop::collection::vec(0.0f32..=1.0, 24),
            half_angle in 0.0f32..3.0,
            attenuation in 0.0f32..=1.0,
        ) {
            let params = SensorParams {
                dilation_half_angle: half_angle,
                dilation_attenuation: attenuation,
                ..Default::default()
            };
            let mut map = ContextMap::new(24);
            for (i, v) in values.iter().enumerate() {
                map.write_danger(i, *v);
            }
            let before = map.danger().to_vec();
            dilate(&mut map, &params);
            for (after, before) in map.danger().iter().zip(&before) {
                prop_assert!(after >= before);
                prop_assert!((0.0..=1.0).contains(after));
            }
        }
    }
}
