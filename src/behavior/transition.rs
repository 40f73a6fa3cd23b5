//! Transition rules

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::definition::BehaviorId;

/// Blend duration used when a rule does not name one.
pub const DEFAULT_BLEND_DURATION: f32 = 0.2;

fn default_blend_duration() -> f32 {
    DEFAULT_BLEND_DURATION
}

/// Which current behaviors a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSource {
    /// Wildcard
    Any,
    /// Only while this behavior is current
    Behavior(BehaviorId),
}

/// A data-driven edge of the behavior state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Source behavior or wildcard
    pub from: RuleSource,
    /// Destination behavior
    pub to: BehaviorId,
    /// Guard
    pub condition: Condition,
    /// Seconds to cross-fade into `to`; 0 switches instantly
    #[serde(default = "default_blend_duration")]
    pub blend_duration: f32,
    /// Seconds after this transition before rules are evaluated again
    #[serde(default)]
    pub cooldown: f32,
    /// Higher wins; ties keep declaration order
    #[serde(default)]
    pub priority: i32,
}

impl TransitionRule {
    /// Rule from a specific behavior.
    pub fn new(
        from: impl Into<BehaviorId>,
        to: impl Into<BehaviorId>,
        condition: Condition,
    ) -> Self {
        Self {
            from: RuleSource::Behavior(from.into()),
            to: to.into(),
            condition,
            blend_duration: DEFAULT_BLEND_DURATION,
            cooldown: 0.0,
            priority: 0,
        }
    }

    /// Rule from any behavior.
    pub fn from_any(to: impl Into<BehaviorId>, condition: Condition) -> Self {
        Self {
            from: RuleSource::Any,
            ..Self::new("", to, condition)
        }
    }

    /// Set the blend duration.
    #[must_use]
    pub fn with_blend(mut self, seconds: f32) -> Self {
        self.blend_duration = seconds;
        self
    }

    /// Set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the rule applies while `current` is active.
    #[must_use]
    pub fn matches_source(&self, current: &BehaviorId) -> bool {
        match &self.from {
            RuleSource::Any => true,
            RuleSource::Behavior(id) => id == current,
        }
    }
}
