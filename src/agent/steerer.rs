//! Per-agent tick driver
//!
//! [`Steerer`] ties the state machine to the pipeline. Each tick it lets the
//! machine pick (and possibly change) the behavior, evaluates the current
//! behavior, and while a blend is running also evaluates the outgoing one
//! and cross-fades the two results.

use std::borrow::Cow;
use std::sync::Arc;

use glam::Vec2;
use smallvec::SmallVec;

use super::pipeline::{Evaluation, SteeringInput, evaluate};
use crate::behavior::{
    AgentSteeringState, BehaviorDefinition, BehaviorId, BehaviorKind, BehaviorLibrary,
    BehaviorStateMachine, BehaviorTransition, Facts, ParamOverrides, SensorCache,
};
use crate::core::{SteeringConfig, SteeringEvent, SteeringResult};
use crate::steering::math::normalize_or_zero;
use crate::steering::{NoiseBank, RayHits, Solution, TurnSide};

/// Everything one tick produced for one agent.
#[derive(Debug, Clone)]
pub struct TickOutput {
    /// Velocity to apply
    pub velocity: Vec2,
    /// New unit heading
    pub heading: Vec2,
    /// New speed
    pub speed: f32,
    /// New wander cursor
    pub wander_cursor: f32,
    /// New deadlock side
    pub deadlock_side: TurnSide,
    /// Solver result of the current behavior
    pub solution: Solution,
    /// Ray hits of the current behavior (diagnostics)
    pub ray_hits: RayHits,
    /// Behavior change this tick, if any
    pub transition: Option<BehaviorTransition>,
    /// Events raised this tick
    pub events: SmallVec<[SteeringEvent; 4]>,
    /// Whether the current behavior's waypoint list is exhausted
    pub path_finished: bool,
    /// Blend progress after this tick
    pub blend_progress: f32,
}

/// Shared behavior library plus rules, driving any number of agents.
#[derive(Debug)]
pub struct Steerer {
    library: Arc<BehaviorLibrary>,
    machine: BehaviorStateMachine,
    initial: BehaviorId,
}

impl Steerer {
    /// Behavior new agents start in when no default is configured.
    pub const FALLBACK_BEHAVIOR: &'static str = "idle";

    /// Create a steerer over a shared library.
    #[must_use]
    pub fn new(library: Arc<BehaviorLibrary>, machine: BehaviorStateMachine) -> Self {
        Self {
            library,
            machine,
            initial: BehaviorId::new(Self::FALLBACK_BEHAVIOR),
        }
    }

    /// Build from a validated config.
    ///
    /// # Errors
    ///
    /// Fails if the config does not validate.
    pub fn from_config(config: &SteeringConfig) -> SteeringResult<Self> {
        let library = config.library()?;
        let machine = BehaviorStateMachine::new(config.rules.clone());
        let mut steerer = Self::new(Arc::new(library), machine);
        if let Some(initial) = config.initial_behavior() {
            steerer.initial = initial.clone();
        }
        Ok(steerer)
    }

    /// The shared library.
    #[must_use]
    pub fn library(&self) -> &Arc<BehaviorLibrary> {
        &self.library
    }

    /// The state machine.
    #[must_use]
    pub fn machine(&self) -> &BehaviorStateMachine {
        &self.machine
    }

    /// Mutable access to the state machine, e.g. to register conditions.
    pub fn machine_mut(&mut self) -> &mut BehaviorStateMachine {
        &mut self.machine
    }

    /// Behavior new agents start in.
    #[must_use]
    pub fn initial_behavior(&self) -> &BehaviorId {
        &self.initial
    }

    /// Fresh agent state in the initial behavior.
    #[must_use]
    pub fn spawn(&self, noise_seed: u32) -> AgentSteeringState {
        if !self.library.contains(self.initial.as_str()) {
            log::warn!(
                "Initial behavior `{}` is not in the library; agents run as idle",
                self.initial
            );
        }
        AgentSteeringState::new(self.initial.clone(), noise_seed)
    }

    /// Force a behavior for `hold_for` seconds. Unknown ids are refused.
    pub fn force_behavior(
        &self,
        state: &mut AgentSteeringState,
        to: impl Into<BehaviorId>,
        now: f32,
        hold_for: f32,
    ) -> Option<BehaviorTransition> {
        let to = to.into();
        if !self.library.contains(to.as_str()) {
            log::warn!("Refusing to force unknown behavior `{to}`");
            return None;
        }
        self.machine.force_behavior(state, to, now, hold_for)
    }

    /// Definition for `id` with overrides merged; unknown ids run as idle.
    fn definition<'a>(
        &'a self,
        id: &BehaviorId,
        overrides: Option<&ParamOverrides>,
    ) -> Cow<'a, BehaviorDefinition> {
        match self.library.get(id.as_str()) {
            Some(definition) => definition.resolved(overrides),
            None => {
                log::trace!("Unknown behavior `{id}`; running as idle");
                let fallback = BehaviorDefinition::new(id.clone(), BehaviorKind::Idle);
                Cow::Owned(fallback.resolved(overrides).into_owned())
            }
        }
    }

    /// Advance one agent by one tick, mutating `state` in place.
    pub fn tick(
        &self,
        state: &mut AgentSteeringState,
        input: &SteeringInput<'_>,
        facts: &Facts,
        overrides: Option<&ParamOverrides>,
        noise: &NoiseBank,
    ) -> TickOutput {
        let step = self.machine.update(state, facts, input.now, input.dt);

        let mut events: SmallVec<[SteeringEvent; 4]> = SmallVec::new();
        if let Some(source) = step.blend_completed {
            events.push(SteeringEvent::BlendCompleted { source });
        }
        if let Some(transition) = &step.transition {
            if !self.library.contains(transition.to.as_str()) {
                log::warn!("Entered unknown behavior `{}`; running as idle", transition.to);
            }
            events.push(SteeringEvent::BehaviorChanged {
                from: transition.from.clone(),
                to: transition.to.clone(),
                manual: transition.manual,
            });
        }

        let snapshot: &AgentSteeringState = state;
        let current = self.definition(&snapshot.current, overrides);
        let target = evaluate(
            &current,
            snapshot,
            snapshot.scratch,
            input,
            noise,
            snapshot.sensor_cache.as_ref(),
        );

        // Outgoing behavior, evaluated from the same starting state
        let outgoing = snapshot.blend_source.as_ref().map(|source| {
            let definition = self.definition(source, overrides);
            evaluate(&definition, snapshot, snapshot.blend_scratch, input, noise, None)
        });

        let (heading, speed, velocity) = match &outgoing {
            Some(outgoing) => blend(outgoing, &target, state.blend_progress),
            None => (
                target.smoothed.heading,
                target.smoothed.speed,
                target.smoothed.velocity(),
            ),
        };

        // Commit
        state.forward = heading;
        state.speed = speed;
        state.wander_cursor = target.wander_cursor;
        state.deadlock_side = target.deadlock_side;
        state.scratch = target.scratch;
        if let Some(outgoing) = &outgoing {
            state.blend_scratch = outgoing.scratch;
        }
        if target.sensed {
            state.sensor_cache = Some(SensorCache {
                behavior: current.id.clone(),
                resolution: target.map.resolution(),
                hits: target.hits.to_vec(),
                age: 0,
            });
        } else if let Some(cache) = state.sensor_cache.as_mut()
            && cache.behavior == current.id
            && !current.params.proximity_sensing
        {
            cache.age += 1;
        }

        let Evaluation {
            solution,
            hits,
            path_finished,
            events: raised,
            ..
        } = target;
        events.extend(raised);

        TickOutput {
            velocity,
            heading,
            speed,
            wander_cursor: state.wander_cursor,
            deadlock_side: state.deadlock_side,
            solution,
            ray_hits: hits,
            transition: step.transition,
            events,
            path_finished,
            blend_progress: state.blend_progress,
        }
    }
}

/// Cross-fade two evaluations by `t` (0 = outgoing, 1 = incoming).
fn blend(outgoing: &Evaluation, incoming: &Evaluation, t: f32) -> (Vec2, f32, Vec2) {
    let t = t.clamp(0.0, 1.0);
    let from = &outgoing.smoothed;
    let to = &incoming.smoothed;

    let velocity = from.velocity().lerp(to.velocity(), t);
    let mut heading = normalize_or_zero(from.heading.lerp(to.heading, t));
    if heading == Vec2::ZERO {
        heading = to.heading;
    }
    let speed = from.speed + (to.speed - from.speed) * t;
    (heading, speed, velocity)
}
