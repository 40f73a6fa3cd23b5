//! Transition conditions
//!
//! Conditions are boolean expressions over a read-only [`Facts`] snapshot.
//! Built-in checks are variants of [`Condition`]; anything else is looked up
//! by name in a [`ConditionRegistry`]. Unknown names and missing facts
//! evaluate to `false`, so a misspelled rule simply never fires.
//!
//! # Example
//!
//! ```ignore
//! // Flee when badly hurt and the threat is close
//! let panic = Condition::all([
//!     Condition::HealthBelow(0.3),
//!     Condition::TargetWithin(8.0),
//! ]);
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Read-only per-tick facts supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facts {
    /// Current health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Whether a target is known
    pub has_target: bool,
    /// Distance to the target, if any
    pub distance_to_target: Option<f32>,
    /// Distance to home
    pub distance_to_home: f32,
    /// Whether the current waypoint list is exhausted
    pub path_finished: bool,
    /// Host-defined numeric facts
    pub custom: FxHashMap<String, f32>,
}

impl Default for Facts {
    fn default() -> Self {
        Self {
            health: 1.0,
            max_health: 1.0,
            has_target: false,
            distance_to_target: None,
            distance_to_home: 0.0,
            path_finished: false,
            custom: FxHashMap::default(),
        }
    }
}

impl Facts {
    /// Health as a fraction of max health. Non-positive max reads as full.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 1.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Set health and max health.
    #[must_use]
    pub fn with_health(mut self, health: f32, max_health: f32) -> Self {
        self.health = health;
        self.max_health = max_health;
        self
    }

    /// Mark a target at `distance`.
    #[must_use]
    pub fn with_target(mut self, distance: f32) -> Self {
        self.has_target = true;
        self.distance_to_target = Some(distance);
        self
    }

    /// Set the distance to home.
    #[must_use]
    pub fn with_home_distance(mut self, distance: f32) -> Self {
        self.distance_to_home = distance;
        self
    }

    /// Set a custom fact.
    #[must_use]
    pub fn with_fact(mut self, name: impl Into<String>, value: f32) -> Self {
        self.custom.insert(name.into(), value);
        self
    }

    /// Look up a numeric fact by name. Built-in names shadow custom ones.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f32> {
        match name {
            "health" => Some(self.health),
            "health_percent" | "health_fraction" => Some(self.health_fraction()),
            "distance_to_target" => self.distance_to_target,
            "distance_to_home" => Some(self.distance_to_home),
            _ => self.custom.get(name).copied(),
        }
    }
}

/// Numeric comparison for [`Condition::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

impl Comparison {
    /// Apply the comparison.
    #[must_use]
    pub fn test(self, lhs: f32, rhs: f32) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Greater => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
        }
    }
}

/// A side-effect-free boolean expression over [`Facts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Always true
    Always,
    /// Always false
    Never,
    /// Health fraction strictly below the value
    HealthBelow(f32),
    /// Health fraction strictly above the value
    HealthAbove(f32),
    /// A target is known
    HasTarget,
    /// Target known and no farther than the value
    TargetWithin(f32),
    /// Target known and farther than the value
    TargetBeyond(f32),
    /// Home no farther than the value
    HomeWithin(f32),
    /// Home farther than the value
    HomeBeyond(f32),
    /// Waypoint list exhausted
    PathFinished,
    /// Seconds since the last transition at least the value
    TimeInBehavior(f32),
    /// Compare a named fact; false when the fact is missing
    Compare {
        /// Fact name, see [`Facts::value`]
        fact: String,
        /// Operator
        op: Comparison,
        /// Right-hand side
        value: f32,
    },
    /// Registered extension predicate; false when unregistered
    Named(String),
    /// Every child true (vacuously true when empty)
    And(Vec<Condition>),
    /// Any child true (false when empty)
    Or(Vec<Condition>),
    /// Child false
    Not(Box<Condition>),
}

/// Inputs a condition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Host facts
    pub facts: &'a Facts,
    /// Extension predicates
    pub registry: &'a ConditionRegistry,
    /// Seconds since the agent's last behavior change
    pub time_in_behavior: f32,
}

impl Condition {
    /// Conjunction helper.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// Disjunction helper.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// Negation helper.
    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Evaluate against `ctx`.
    #[must_use]
    pub fn evaluate(&self, ctx: &ConditionContext<'_>) -> bool {
        let facts = ctx.facts;
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::HealthBelow(limit) => facts.health_fraction() < *limit,
            Self::HealthAbove(limit) => facts.health_fraction() > *limit,
            Self::HasTarget => facts.has_target,
            Self::TargetWithin(range) => {
                facts.has_target && facts.distance_to_target.is_some_and(|d| d <= *range)
            }
            Self::TargetBeyond(range) => {
                facts.has_target && facts.distance_to_target.is_some_and(|d| d > *range)
            }
            Self::HomeWithin(range) => facts.distance_to_home <= *range,
            Self::HomeBeyond(range) => facts.distance_to_home > *range,
            Self::PathFinished => facts.path_finished,
            Self::TimeInBehavior(seconds) => ctx.time_in_behavior >= *seconds,
            Self::Compare { fact, op, value } => facts
                .value(fact)
                .is_some_and(|actual| op.test(actual, *value)),
            Self::Named(name) => ctx.registry.evaluate(name, facts),
            Self::And(children) => children.iter().all(|c| c.evaluate(ctx)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(ctx)),
            Self::Not(child) => !child.evaluate(ctx),
        }
    }
}

type Predicate = Box<dyn Fn(&Facts) -> bool + Send + Sync>;

/// Name → predicate table for [`Condition::Named`].
#[derive(Default)]
pub struct ConditionRegistry {
    predicates: FxHashMap<String, Predicate>,
}

impl ConditionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a predicate.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Facts) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Box::new(predicate));
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Run a predicate. Unregistered names are false.
    #[must_use]
    pub fn evaluate(&self, name: &str, facts: &Facts) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(facts),
            None => {
                log::trace!("Condition `{name}` is not registered; treating as false");
                false
            }
        }
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ConditionRegistry")
            .field("predicates", &names)
            .finish()
    }
}
