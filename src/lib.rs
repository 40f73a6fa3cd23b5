//! Context-based steering for game agents
//!
//! This crate provides:
//! - Context maps of interest and danger sampled around a unit circle
//! - Shaping behaviors (seek, flee, strafe, wander, tether, path following)
//! - Raycast danger sensing against circular obstacles
//! - A solver with sub-slot refinement, deadlock breaking and heading smoothing
//! - A behavior state machine with blended transitions
//! - Parallel batch ticking with rayon

pub mod agent;
pub mod behavior;
pub mod core;
pub mod steering;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agent::{AgentFrame, Steerer, SteeringInput, TickOutput, publish_events, tick_all};
    pub use crate::behavior::{
        AgentSteeringState, BehaviorDefinition, BehaviorKind, BehaviorStateMachine, Condition,
        Facts, TransitionRule,
    };
    pub use crate::core::{EventQueue, SteeringConfig, SteeringError, SteeringEvent, SteeringStats};
    pub use crate::steering::{ContextMap, NoiseBank, Obstacle, Solution, TurnSide};
    pub use glam::Vec2;
}
