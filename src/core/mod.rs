//! Core module
//!
//! Configuration loading, errors, steering events and statistics

mod config;
mod debug;
mod error;
mod events;

pub use config::SteeringConfig;
pub use debug::SteeringStats;
pub use error::{SteeringError, SteeringResult};
pub use events::{AgentEvent, EventQueue, SteeringEvent};
