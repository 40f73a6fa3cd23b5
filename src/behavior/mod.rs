//! Behavior selection
//!
//! Shared behavior definitions, transition conditions and rules, per-agent
//! state, and the state machine that drives them.

mod condition;
mod definition;
mod fsm;
mod state;
mod transition;

pub use condition::{Comparison, Condition, ConditionContext, ConditionRegistry, Facts};
pub use definition::{
    BehaviorDefinition, BehaviorId, BehaviorKind, BehaviorLibrary, BehaviorParams, ParamOverrides,
    WanderTuning,
};
pub use fsm::{BehaviorStateMachine, BehaviorTransition, MachineStep};
pub use state::{AgentSteeringState, BehaviorScratch, SensorCache};
pub use transition::{DEFAULT_BLEND_DURATION, RuleSource, TransitionRule};
