//! Behavior State Machine
//!
//! Selects which behavior feeds the steering pipeline. States are behavior
//! ids, edges are data-driven [`TransitionRule`]s, and every change starts a
//! timed blend so the agent never snaps between headings.
//!
//! # Design Principles
//!
//! - **Data-driven**: Rules are plain data, loadable from config files
//! - **Stateless machine**: All per-agent memory lives in [`AgentSteeringState`],
//!   so one machine serves any number of agents in parallel
//! - **Debuggability**: Every transition is reported and logged
//!
//! # Example
//!
//! ```ignore
//! let machine = BehaviorStateMachine::new(vec![
//!     TransitionRule::new("idle", "flee", Condition::HealthBelow(0.3)),
//! ]);
//!
//! let mut state = AgentSteeringState::new("idle", 7);
//! let facts = Facts::default().with_health(10.0, 100.0);
//! let step = machine.update(&mut state, &facts, now, dt);  // Switches to flee
//! ```

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::condition::{ConditionContext, ConditionRegistry, Facts};
use super::definition::BehaviorId;
use super::state::AgentSteeringState;
use super::transition::{DEFAULT_BLEND_DURATION, TransitionRule};

// ============================================================================
// Transition Report
// ============================================================================

/// A behavior change that happened this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTransition {
    /// Behavior left
    pub from: BehaviorId,
    /// Behavior entered
    pub to: BehaviorId,
    /// Blend length, seconds (0 = instant)
    pub blend_duration: f32,
    /// Clock time of the change
    pub at: f32,
    /// Whether the change was forced by the host
    pub manual: bool,
}

/// What one [`BehaviorStateMachine::update`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineStep {
    /// Behavior change, if any
    pub transition: Option<BehaviorTransition>,
    /// Source of a blend that finished this tick
    pub blend_completed: Option<BehaviorId>,
}

// ============================================================================
// State Machine
// ============================================================================

/// Rule-driven behavior selection.
///
/// The machine holds only rules and condition predicates; call
/// [`update`](Self::update) once per agent per tick.
#[derive(Debug, Default)]
pub struct BehaviorStateMachine {
    /// Rules, highest priority first, declaration order within a priority
    rules: Vec<TransitionRule>,
    /// Predicates for `Condition::Named`
    registry: ConditionRegistry,
}

impl BehaviorStateMachine {
    /// Create a machine. Rules are ordered by descending priority; equal
    /// priorities keep their relative order.
    #[must_use]
    pub fn new(mut rules: Vec<TransitionRule>) -> Self {
        rules.sort_by_key(|rule| Reverse(rule.priority));
        Self {
            rules,
            registry: ConditionRegistry::new(),
        }
    }

    /// Use `registry` for named conditions.
    #[must_use]
    pub fn with_registry(mut self, registry: ConditionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Mutable access to the named-condition registry.
    pub fn registry_mut(&mut self) -> &mut ConditionRegistry {
        &mut self.registry
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Advance one tick.
    ///
    /// 1. Advance any in-progress blend
    /// 2. Skip rule evaluation while a manual override or cooldown is active
    /// 3. Otherwise the first matching rule to a different behavior wins
    pub fn update(
        &self,
        state: &mut AgentSteeringState,
        facts: &Facts,
        now: f32,
        dt: f32,
    ) -> MachineStep {
        let mut step = MachineStep {
            blend_completed: state.advance_blend(dt),
            ..Default::default()
        };

        if state.is_overridden(now) {
            return step;
        }
        state.manual_override_until = None;

        if state.in_cooldown(now) {
            return step;
        }

        let ctx = ConditionContext {
            facts,
            registry: &self.registry,
            time_in_behavior: state.time_in_behavior(now),
        };
        let Some(rule) = self
            .rules
            .iter()
            .filter(|rule| rule.matches_source(&state.current))
            .find(|rule| rule.condition.evaluate(&ctx))
        else {
            return step;
        };

        // A winning rule back into the current behavior is a no-op
        if rule.to == state.current {
            return step;
        }

        let from = state.switch_to(rule.to.clone(), rule.blend_duration, rule.cooldown, now);
        log::debug!(
            "Behavior {} -> {} (blend {:.2}s)",
            from,
            rule.to,
            rule.blend_duration
        );
        step.transition = Some(BehaviorTransition {
            from,
            to: rule.to.clone(),
            blend_duration: rule.blend_duration,
            at: now,
            manual: false,
        });
        step
    }

    /// Switch to `to` immediately and hold it for `hold_for` seconds.
    ///
    /// Automatic rules are not evaluated while the hold lasts. Forcing the
    /// current behavior only extends the hold.
    pub fn force_behavior(
        &self,
        state: &mut AgentSteeringState,
        to: impl Into<BehaviorId>,
        now: f32,
        hold_for: f32,
    ) -> Option<BehaviorTransition> {
        let to = to.into();
        state.manual_override_until = Some(now + hold_for.max(0.0));
        if to == state.current {
            return None;
        }

        let from = state.switch_to(to.clone(), DEFAULT_BLEND_DURATION, 0.0, now);
        log::debug!("Behavior {from} -> {to} (forced for {hold_for:.2}s)");
        Some(BehaviorTransition {
            from,
            to,
            blend_duration: DEFAULT_BLEND_DURATION,
            at: now,
            manual: true,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::condition::Condition;

    fn panic_machine() -> BehaviorStateMachine {
        BehaviorStateMachine::new(vec![TransitionRule::new(
            "idle",
            "flee",
            Condition::HealthBelow(0.3),
        )])
    }

    #[test]
    fn test_idle_to_flee_with_blend() {
        let machine = panic_machine();
        let mut state = AgentSteeringState::new("idle", 1);
        let hurt = Facts::default().with_health(10.0, 100.0);

        let step = machine.update(&mut state, &hurt, 0.0, 0.05);
        let transition = step.transition.unwrap();
        assert_eq!(transition.from.as_str(), "idle");
        assert_eq!(transition.to.as_str(), "flee");
        assert_eq!(state.current.as_str(), "flee");
        assert_eq!(state.blend_source, Some("idle".into()));
        assert_eq!(state.blend_progress, 0.0);

        // 0.2s of accumulated ticks completes the blend
        let dt = 0.05;
        let mut now = 0.0;
        for tick in 1..=4 {
            now += dt;
            let step = machine.update(&mut state, &hurt, now, dt);
            assert!(step.transition.is_none());
            if tick < 4 {
                assert!(state.blend_progress < 1.0);
                assert!(step.blend_completed.is_none());
            } else {
                assert_eq!(step.blend_completed, Some("idle".into()));
            }
        }
        assert_eq!(state.blend_progress, 1.0);
        assert!(state.blend_source.is_none());
    }

    #[test]
    fn test_healthy_stays_idle() {
        let machine = panic_machine();
        let mut state = AgentSteeringState::new("idle", 1);
        let step = machine.update(&mut state, &Facts::default(), 0.0, 0.1);
        assert!(step.transition.is_none());
        assert_eq!(state.current.as_str(), "idle");
    }

    #[test]
    fn test_priority_beats_declaration_order() {
        let machine = BehaviorStateMachine::new(vec![
            TransitionRule::from_any("seek", Condition::HasTarget),
            TransitionRule::from_any("flee", Condition::HasTarget).with_priority(5),
        ]);
        let mut state = AgentSteeringState::new("idle", 1);
        let facts = Facts::default().with_target(4.0);
        machine.update(&mut state, &facts, 0.0, 0.1);
        assert_eq!(state.current.as_str(), "flee");
    }

    #[test]
    fn test_equal_priority_keeps_declaration_order() {
        let machine = BehaviorStateMachine::new(vec![
            TransitionRule::from_any("seek", Condition::Always).with_priority(1),
            TransitionRule::from_any("flee", Condition::Always).with_priority(1),
        ]);
        assert_eq!(machine.rules()[0].to.as_str(), "seek");
        let mut state = AgentSteeringState::new("idle", 1);
        machine.update(&mut state, &Facts::default(), 0.0, 0.1);
        assert_eq!(state.current.as_str(), "seek");
    }

    #[test]
    fn test_self_transition_is_ignored() {
        let machine = BehaviorStateMachine::new(vec![TransitionRule::from_any(
            "wander",
            Condition::Always,
        )]);
        let mut state = AgentSteeringState::new("wander", 1);
        let step = machine.update(&mut state, &Facts::default(), 1.0, 0.1);
        assert!(step.transition.is_none());
        assert!(state.previous.is_none());
    }

    #[test]
    fn test_cooldown_gates_evaluation() {
        let machine = BehaviorStateMachine::new(vec![
            TransitionRule::new("idle", "seek", Condition::HasTarget).with_cooldown(1.0),
            TransitionRule::new("seek", "flee", Condition::HealthBelow(0.5)),
        ]);
        let mut state = AgentSteeringState::new("idle", 1);
        let facts = Facts::default().with_target(3.0).with_health(1.0, 10.0);

        machine.update(&mut state, &facts, 0.0, 0.1);
        assert_eq!(state.current.as_str(), "seek");

        machine.update(&mut state, &facts, 0.5, 0.1);
        assert_eq!(state.current.as_str(), "seek");

        machine.update(&mut state, &facts, 1.0, 0.1);
        assert_eq!(state.current.as_str(), "flee");
    }

    #[test]
    fn test_zero_blend_switches_instantly() {
        let machine = BehaviorStateMachine::new(vec![
            TransitionRule::new("idle", "seek", Condition::Always).with_blend(0.0),
        ]);
        let mut state = AgentSteeringState::new("idle", 1);
        let step = machine.update(&mut state, &Facts::default(), 0.0, 0.1);
        assert_eq!(step.transition.unwrap().blend_duration, 0.0);
        assert!(!state.is_blending());
        assert_eq!(state.blend_progress, 1.0);
    }

    #[test]
    fn test_manual_override_suppresses_rules() {
        let machine = panic_machine();
        let mut state = AgentSteeringState::new("idle", 1);
        let hurt = Facts::default().with_health(1.0, 100.0);

        let forced = machine.force_behavior(&mut state, "wander", 0.0, 2.0).unwrap();
        assert!(forced.manual);
        assert_eq!(state.current.as_str(), "wander");
        assert!(state.is_blending());

        // The idle -> flee rule no longer applies, and nothing else may fire
        machine.update(&mut state, &hurt, 1.0, 0.1);
        assert_eq!(state.current.as_str(), "wander");

        // Forcing back to idle, then letting the window lapse
        machine.force_behavior(&mut state, "idle", 1.0, 1.0);
        machine.update(&mut state, &hurt, 1.5, 0.1);
        assert_eq!(state.current.as_str(), "idle");
        machine.update(&mut state, &hurt, 2.0, 0.1);
        assert_eq!(state.current.as_str(), "flee");
        assert!(state.manual_override_until.is_none());
    }

    #[test]
    fn test_force_current_extends_hold() {
        let machine = panic_machine();
        let mut state = AgentSteeringState::new("idle", 1);
        assert!(machine.force_behavior(&mut state, "idle", 0.0, 3.0).is_none());
        assert_eq!(state.manual_override_until, Some(3.0));
    }

    #[test]
    fn test_named_condition_via_registry() {
        let mut registry = ConditionRegistry::new();
        registry.register("alarm", |facts| facts.value("alarm").is_some_and(|v| v > 0.0));
        let machine = BehaviorStateMachine::new(vec![TransitionRule::from_any(
            "flee",
            Condition::Named("alarm".to_string()),
        )])
        .with_registry(registry);

        let mut state = AgentSteeringState::new("idle", 1);
        machine.update(&mut state, &Facts::default(), 0.0, 0.1);
        assert_eq!(state.current.as_str(), "idle");
        machine.update(&mut state, &Facts::default().with_fact("alarm", 1.0), 0.1, 0.1);
        assert_eq!(state.current.as_str(), "flee");
    }

    #[test]
    fn test_time_in_behavior_condition() {
        let machine = BehaviorStateMachine::new(vec![TransitionRule::new(
            "idle",
            "wander",
            Condition::TimeInBehavior(2.0),
        )]);
        let mut state = AgentSteeringState::new("idle", 1);
        machine.update(&mut state, &Facts::default(), 1.0, 0.1);
        assert_eq!(state.current.as_str(), "idle");
        machine.update(&mut state, &Facts::default(), 2.0, 0.1);
        assert_eq!(state.current.as_str(), "wander");
    }
}
