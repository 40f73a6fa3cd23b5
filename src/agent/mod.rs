//! Agent driving
//!
//! Runs behaviors through the steering pipeline for one agent or a whole
//! batch.

mod batch;
mod pipeline;
mod steerer;

pub use batch::{AgentFrame, publish_events, tick_all};
pub use pipeline::{Evaluation, SteeringInput, evaluate};
pub use steerer::{Steerer, TickOutput};
