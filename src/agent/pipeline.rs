//! Single-behavior evaluation
//!
//! [`evaluate`] runs one behavior definition against one agent for one tick:
//! shape interest for the behavior kind, sense danger, optionally lock onto
//! a clear corridor, break deadlocks, solve and smooth. It reads the agent
//! state but never writes it, so the steerer can run two evaluations from the
//! same starting point while blending.

use glam::Vec2;
use smallvec::SmallVec;
use std::f32::consts::FRAC_PI_2;

use crate::behavior::{
    AgentSteeringState, BehaviorDefinition, BehaviorKind, BehaviorScratch, SensorCache,
};
use crate::core::SteeringEvent;
use crate::steering::math::{EPSILON, cross, normalize_or_zero, rotate};
use crate::steering::{
    ContextMap, Flee, NoiseBank, Obstacle, PathLock, RayHits, ShapingBehavior, Smoothed, Solution,
    SolveMode, Strafe, TIE_BREAK_SIDE, Tether, TurnSide, Wander, WanderParams, apply_cached,
    has_line_of_sight, integrate, resolve_deadlock, seek, sense, sense_proximity, solve,
};

/// Share of the strafe weight added along the chosen orbit tangent.
const ORBIT_BIAS: f32 = 0.25;

/// Salt separating the speed-variation noise from wander noise.
const SPEED_NOISE_SALT: u32 = 0x9E37_79B9;

/// Speed-variation noise cursor advance per second of clock time.
const SPEED_NOISE_RATE: f32 = 0.25;

/// Per-tick world inputs for one agent.
#[derive(Debug, Clone, Copy)]
pub struct SteeringInput<'a> {
    /// Agent position
    pub position: Vec2,
    /// Target point, if any
    pub target: Option<Vec2>,
    /// Home point for tethering
    pub home: Vec2,
    /// Waypoints supplied by the path planner
    pub waypoints: &'a [Vec2],
    /// Read-only obstacle snapshot
    pub obstacles: &'a [Obstacle],
    /// Tick length, seconds
    pub dt: f32,
    /// Clock time, seconds
    pub now: f32,
}

impl<'a> SteeringInput<'a> {
    /// Input with no target, home at the origin and no waypoints.
    #[must_use]
    pub fn new(position: Vec2, obstacles: &'a [Obstacle], dt: f32, now: f32) -> Self {
        Self {
            position,
            target: None,
            home: Vec2::ZERO,
            waypoints: &[],
            obstacles,
            dt,
            now,
        }
    }

    /// Set the target point.
    #[must_use]
    pub fn with_target(mut self, target: Option<Vec2>) -> Self {
        self.target = target;
        self
    }

    /// Set the home point.
    #[must_use]
    pub fn with_home(mut self, home: Vec2) -> Self {
        self.home = home;
        self
    }

    /// Set the waypoint list.
    #[must_use]
    pub fn with_waypoints(mut self, waypoints: &'a [Vec2]) -> Self {
        self.waypoints = waypoints;
        self
    }
}

/// Result of evaluating one behavior.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Integrated heading and speed
    pub smoothed: Smoothed,
    /// Raw solver output
    pub solution: Solution,
    /// Wander cursor after this tick
    pub wander_cursor: f32,
    /// Deadlock side to persist
    pub deadlock_side: TurnSide,
    /// Behavior scratch after this tick
    pub scratch: BehaviorScratch,
    /// Ray hits applied this tick, fresh or cached
    pub hits: RayHits,
    /// Whether a fresh sensing pass ran
    pub sensed: bool,
    /// Whether a path lock was applied
    pub locked: bool,
    /// Whether the waypoint list is exhausted
    pub path_finished: bool,
    /// Events raised while evaluating
    pub events: SmallVec<[SteeringEvent; 4]>,
    /// The final context map
    pub map: ContextMap,
}

/// Evaluate `definition` for one tick.
///
/// `scratch` is the behavior-local memory to start from (reset when it
/// belongs to another kind). `cache` holds hits from an earlier sensing pass;
/// it is reused while younger than the definition's sensing interval.
pub fn evaluate(
    definition: &BehaviorDefinition,
    state: &AgentSteeringState,
    scratch: BehaviorScratch,
    input: &SteeringInput<'_>,
    noise: &NoiseBank,
    cache: Option<&SensorCache>,
) -> Evaluation {
    let p = &definition.params;
    let position = input.position;
    let mut map = ContextMap::new(p.resolution);
    let mut scratch = scratch.for_kind(definition.kind);
    let mut events = SmallVec::new();
    let mut wander_cursor = state.wander_cursor;
    let mut path_finished = false;

    // Direction the deadlock resolver protects, and a point worth locking onto
    let mut goal: Option<Vec2> = None;
    let mut lock_point: Option<Vec2> = None;

    match definition.kind {
        BehaviorKind::Idle => {}
        BehaviorKind::Seek => {
            if let Some(target) = input.target {
                let to = target - position;
                seek(&mut map, to, p.seek_weight);
                goal = Some(to);
                lock_point = Some(target);
            }
        }
        BehaviorKind::Flee => {
            if let Some(target) = input.target {
                let to = target - position;
                Flee::new(to, p.flee_weight).shape(&mut map);
                goal = Some(-to);
            }
        }
        BehaviorKind::Strafe => {
            if let Some(target) = input.target {
                let to = target - position;
                let strafe = Strafe::new(to, to.length(), p.strafe);
                strafe.shape(&mut map);

                let distance = strafe.distance;
                goal = Some(if distance > p.strafe.max_range {
                    to
                } else if distance < p.strafe.min_range {
                    -to
                } else {
                    let mut orbit = match scratch {
                        BehaviorScratch::Strafe { orbit } => orbit,
                        _ => TurnSide::None,
                    };
                    if !orbit.is_engaged() {
                        let c = cross(state.forward, normalize_or_zero(to));
                        orbit = if c.abs() <= EPSILON {
                            TIE_BREAK_SIDE
                        } else {
                            TurnSide::from_sign(c)
                        };
                    }
                    scratch = BehaviorScratch::Strafe { orbit };

                    // Favour one tangent so the orbit does not flip between ticks
                    let tangent = rotate(to, -f32::from(orbit.sign()) * FRAC_PI_2);
                    seek(
                        &mut map,
                        tangent,
                        strafe.blend() * p.strafe.strafe_weight * ORBIT_BIAS,
                    );
                    tangent
                });
            }
        }
        BehaviorKind::Wander => {
            let params = WanderParams {
                angle_range: p.wander.angle_range,
                weight: p.wander.weight,
                seed: state.noise_seed,
            };
            Wander::new(state.forward, wander_cursor, params, noise).shape(&mut map);
            wander_cursor += p.wander.rate * input.dt.max(0.0);

            if p.leash_radius > 0.0 {
                let tether = Tether::new(position, input.home, p.leash_radius, p.tether_weight);
                if tether.strength() > 0.0 {
                    tether.shape(&mut map);
                    goal = Some(input.home - position);
                }
            }
        }
        BehaviorKind::Tether => {
            let to_home = input.home - position;
            let tether = Tether::new(position, input.home, p.leash_radius, p.tether_weight);
            let mut returning = matches!(scratch, BehaviorScratch::Tether { returning: true });

            if tether.strength() > 0.0 {
                returning = true;
                tether.shape(&mut map);
            } else if returning {
                // Inside the leash: keep walking until home is reached
                if to_home.length() <= p.waypoint_radius {
                    returning = false;
                } else {
                    seek(&mut map, to_home, p.tether_weight);
                }
            }

            scratch = BehaviorScratch::Tether { returning };
            if returning {
                goal = Some(to_home);
                lock_point = Some(input.home);
            }
        }
        BehaviorKind::FollowPath => {
            let start = match scratch {
                BehaviorScratch::FollowPath { waypoint } => waypoint,
                _ => 0,
            };
            let mut index = start;
            while let Some(&waypoint) = input.waypoints.get(index) {
                if position.distance(waypoint) > p.waypoint_radius {
                    break;
                }
                events.push(SteeringEvent::WaypointReached { index });
                index += 1;
            }
            scratch = BehaviorScratch::FollowPath { waypoint: index };

            match input.waypoints.get(index) {
                Some(&waypoint) => {
                    let to = waypoint - position;
                    seek(&mut map, to, p.seek_weight);
                    goal = Some(to);
                    lock_point = Some(waypoint);
                }
                None => {
                    path_finished = true;
                    if index > start {
                        events.push(SteeringEvent::PathFinished);
                    }
                }
            }
        }
    }

    // Danger
    let (hits, sensed) = if p.proximity_sensing {
        sense_proximity(&mut map, position, input.obstacles, &p.sensor);
        (RayHits::new(), false)
    } else {
        let resolution = map.resolution();
        let reusable = cache.filter(|c| c.reusable(&definition.id, resolution, p.sense_interval));
        match reusable {
            Some(cache) => {
                apply_cached(&mut map, &cache.hits, &p.sensor);
                (cache.hits.iter().copied().collect(), false)
            }
            None => (sense(&mut map, position, input.obstacles, &p.sensor), true),
        }
    };

    // Path lock, only with an independently confirmed clear line
    let mut solver = p.solver;
    let mut locked = false;
    if let Some(point) = lock_point
        && p.path_lock_boost > 0.0
        && has_line_of_sight(
            position,
            point,
            p.sensor.agent_radius,
            input.obstacles,
            p.sensor.exclude_tag,
        )
    {
        PathLock::new(point - position, p.path_lock_boost).shape(&mut map);
        solver.mode = SolveMode::WinnerTakeAll;
        locked = true;
    }

    // Deadlock
    let deadlock_side = match goal {
        Some(goal) => resolve_deadlock(
            &mut map,
            state.forward,
            goal,
            &p.deadlock,
            state.deadlock_side,
        ),
        None => TurnSide::None,
    };
    match (state.deadlock_side.is_engaged(), deadlock_side.is_engaged()) {
        (false, true) => events.push(SteeringEvent::DeadlockEngaged { side: deadlock_side }),
        (true, false) => events.push(SteeringEvent::DeadlockCleared),
        _ => {}
    }

    let solution = solve(&map, &solver);

    let speed_scale = if p.speed_noise > 0.0 {
        let seed = state.noise_seed ^ SPEED_NOISE_SALT;
        let variation = noise.sample_1d(seed, input.now * SPEED_NOISE_RATE);
        1.0 + p.speed_noise * variation
    } else {
        1.0
    };
    let smoothed = integrate(
        state.forward,
        state.speed,
        &solution,
        &p.smoothing,
        speed_scale,
        input.dt,
    );

    Evaluation {
        smoothed,
        solution,
        wander_cursor,
        deadlock_side,
        scratch,
        hits,
        sensed,
        locked,
        path_finished,
        events,
        map,
    }
}
