//! Persistent per-agent steering state
//!
//! [`AgentSteeringState`] is owned by the host and mutated in place every
//! tick. It is plain data: the state machine and pipeline decide what goes
//! in it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::definition::{BehaviorId, BehaviorKind};
use crate::steering::math::normalize_or_zero;
use crate::steering::{RayHit, TurnSide};

/// Blend progress this close to 1 counts as finished.
const BLEND_SNAP: f32 = 1e-4;

/// Behavior-local memory, cleared on every behavior change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum BehaviorScratch {
    /// Nothing stored yet
    #[default]
    Empty,
    /// Index of the next waypoint
    FollowPath {
        /// Next waypoint
        waypoint: usize,
    },
    /// Orbit direction chosen on entering the strafe band
    Strafe {
        /// Tangent side
        orbit: TurnSide,
    },
    /// Whether the agent is walking back after leaving its leash
    Tether {
        /// Homing latch
        returning: bool,
    },
}

impl BehaviorScratch {
    /// Initial scratch for a behavior kind.
    #[must_use]
    pub fn fresh(kind: BehaviorKind) -> Self {
        match kind {
            BehaviorKind::FollowPath => Self::FollowPath { waypoint: 0 },
            BehaviorKind::Strafe => Self::Strafe {
                orbit: TurnSide::None,
            },
            BehaviorKind::Tether => Self::Tether { returning: false },
            BehaviorKind::Idle | BehaviorKind::Seek | BehaviorKind::Flee | BehaviorKind::Wander => {
                Self::Empty
            }
        }
    }

    /// Whether this scratch belongs to `kind`.
    #[must_use]
    pub fn matches(&self, kind: BehaviorKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::fresh(kind))
    }

    /// This scratch if it belongs to `kind`, otherwise a fresh one.
    #[must_use]
    pub fn for_kind(self, kind: BehaviorKind) -> Self {
        if self.matches(kind) { self } else { Self::fresh(kind) }
    }
}

/// Ray hits kept between throttled sensing passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCache {
    /// Behavior that sensed
    pub behavior: BehaviorId,
    /// Map resolution at sensing time
    pub resolution: usize,
    /// Hits from the last full pass
    pub hits: Vec<RayHit>,
    /// Ticks since the last full pass
    pub age: u32,
}

impl SensorCache {
    /// Whether these hits can stand in for a fresh pass this tick.
    #[must_use]
    pub fn reusable(&self, behavior: &BehaviorId, resolution: usize, interval: u32) -> bool {
        self.behavior == *behavior && self.resolution == resolution && self.age + 1 < interval
    }
}

/// Everything the engine remembers about one agent between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSteeringState {
    /// Unit heading
    pub forward: Vec2,
    /// Smoothed speed
    pub speed: f32,
    /// Wander noise cursor
    pub wander_cursor: f32,
    /// Per-agent noise seed
    pub noise_seed: u32,
    /// Persisted deadlock side
    pub deadlock_side: TurnSide,
    /// Active behavior
    pub current: BehaviorId,
    /// Behavior before the last change
    pub previous: Option<BehaviorId>,
    /// Behavior being blended out, if any
    pub blend_source: Option<BehaviorId>,
    /// Blend progress in [0, 1]; 1 when not blending
    pub blend_progress: f32,
    /// Length of the current blend, seconds
    pub blend_duration: f32,
    /// Clock time of the last behavior change
    pub last_transition_at: Option<f32>,
    /// Cooldown stamped by the last change, seconds
    pub transition_cooldown: f32,
    /// Automatic transitions are suppressed until this time
    pub manual_override_until: Option<f32>,
    /// Scratch of the current behavior
    pub scratch: BehaviorScratch,
    /// Scratch of the blend source
    pub blend_scratch: BehaviorScratch,
    /// Throttled sensing cache
    pub sensor_cache: Option<SensorCache>,
}

impl AgentSteeringState {
    /// Fresh state in `initial`, facing +X and at rest.
    pub fn new(initial: impl Into<BehaviorId>, noise_seed: u32) -> Self {
        Self {
            forward: Vec2::X,
            speed: 0.0,
            wander_cursor: 0.0,
            noise_seed,
            deadlock_side: TurnSide::None,
            current: initial.into(),
            previous: None,
            blend_source: None,
            blend_progress: 1.0,
            blend_duration: 0.0,
            last_transition_at: None,
            transition_cooldown: 0.0,
            manual_override_until: None,
            scratch: BehaviorScratch::Empty,
            blend_scratch: BehaviorScratch::Empty,
            sensor_cache: None,
        }
    }

    /// Set the initial heading. Zero keeps +X.
    #[must_use]
    pub fn with_forward(mut self, forward: Vec2) -> Self {
        let forward = normalize_or_zero(forward);
        if forward != Vec2::ZERO {
            self.forward = forward;
        }
        self
    }

    /// `forward * speed`
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.forward * self.speed
    }

    /// Whether a blend is in progress.
    #[must_use]
    pub fn is_blending(&self) -> bool {
        self.blend_source.is_some()
    }

    /// Seconds since the last behavior change (or since time zero).
    #[must_use]
    pub fn time_in_behavior(&self, now: f32) -> f32 {
        (now - self.last_transition_at.unwrap_or(0.0)).max(0.0)
    }

    /// Whether a manual override window is open.
    #[must_use]
    pub fn is_overridden(&self, now: f32) -> bool {
        self.manual_override_until.is_some_and(|until| now < until)
    }

    /// Whether the last change's cooldown is still running.
    #[must_use]
    pub fn in_cooldown(&self, now: f32) -> bool {
        self.last_transition_at
            .is_some_and(|at| now - at < self.transition_cooldown)
    }

    /// Advance the blend by `dt`. Returns the source id when the blend
    /// finishes this call.
    pub fn advance_blend(&mut self, dt: f32) -> Option<BehaviorId> {
        self.blend_source.as_ref()?;

        let step = if self.blend_duration > 0.0 {
            dt.max(0.0) / self.blend_duration
        } else {
            1.0
        };
        let progress = (self.blend_progress + step).min(1.0);
        self.blend_progress = if 1.0 - progress <= BLEND_SNAP { 1.0 } else { progress };

        if self.blend_progress >= 1.0 {
            self.blend_scratch = BehaviorScratch::Empty;
            return self.blend_source.take();
        }
        None
    }

    /// Switch to `to`, snapshotting the current behavior as blend source.
    ///
    /// Zero `blend_duration` switches instantly.
    pub fn switch_to(
        &mut self,
        to: BehaviorId,
        blend_duration: f32,
        cooldown: f32,
        now: f32,
    ) -> BehaviorId {
        let from = std::mem::replace(&mut self.current, to);
        let scratch = std::mem::take(&mut self.scratch);

        if blend_duration > 0.0 {
            self.blend_source = Some(from.clone());
            self.blend_scratch = scratch;
            self.blend_progress = 0.0;
            self.blend_duration = blend_duration;
        } else {
            self.blend_source = None;
            self.blend_scratch = BehaviorScratch::Empty;
            self.blend_progress = 1.0;
            self.blend_duration = 0.0;
        }

        self.previous = Some(from.clone());
        self.last_transition_at = Some(now);
        self.transition_cooldown = cooldown.max(0.0);
        from
    }
}
