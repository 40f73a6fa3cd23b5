//! Parallel batch ticking
//!
//! Agents are independent: each one reads the shared obstacle snapshot,
//! library and noise bank, and writes only its own state. [`tick_all`] fans
//! them out across the rayon thread pool.

use glam::Vec2;
use rayon::prelude::*;

use super::pipeline::SteeringInput;
use super::steerer::{Steerer, TickOutput};
use crate::behavior::{AgentSteeringState, Facts, ParamOverrides};
use crate::core::EventQueue;
use crate::steering::{NoiseBank, Obstacle};

/// One agent's persistent state plus the host-supplied inputs for a tick.
#[derive(Debug, Clone)]
pub struct AgentFrame {
    /// Persistent steering state
    pub state: AgentSteeringState,
    /// Current position
    pub position: Vec2,
    /// Target point, if any
    pub target: Option<Vec2>,
    /// Home point
    pub home: Vec2,
    /// Waypoints from the path planner
    pub waypoints: Vec<Vec2>,
    /// Facts for transition conditions
    pub facts: Facts,
    /// Per-agent parameter overrides
    pub overrides: Option<ParamOverrides>,
}

impl AgentFrame {
    /// Agent at `position` with home at the same spot.
    #[must_use]
    pub fn new(state: AgentSteeringState, position: Vec2) -> Self {
        Self {
            state,
            position,
            target: None,
            home: position,
            waypoints: Vec::new(),
            facts: Facts::default(),
            overrides: None,
        }
    }

    /// Move by the tick's velocity.
    pub fn advance(&mut self, output: &TickOutput, dt: f32) {
        self.position += output.velocity * dt;
    }
}

/// Tick every agent in parallel. Outputs are in agent order.
///
/// Each frame's `facts.path_finished` is refreshed from its output so the
/// next tick's conditions can see it.
pub fn tick_all(
    steerer: &Steerer,
    agents: &mut [AgentFrame],
    obstacles: &[Obstacle],
    noise: &NoiseBank,
    dt: f32,
    now: f32,
) -> Vec<TickOutput> {
    agents
        .par_iter_mut()
        .map(|agent| {
            let input = SteeringInput::new(agent.position, obstacles, dt, now)
                .with_target(agent.target)
                .with_home(agent.home)
                .with_waypoints(&agent.waypoints);
            let output = steerer.tick(
                &mut agent.state,
                &input,
                &agent.facts,
                agent.overrides.as_ref(),
                noise,
            );
            agent.facts.path_finished = output.path_finished;
            output
        })
        .collect()
}

/// Push every output's events, tagged with its agent index.
pub fn publish_events(outputs: &[TickOutput], queue: &mut EventQueue) {
    for (agent, output) in outputs.iter().enumerate() {
        queue.extend(agent, output.events.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorDefinition, BehaviorKind, Condition, TransitionRule};
    use crate::core::{SteeringConfig, SteeringEvent};

    fn steerer() -> Steerer {
        let config = SteeringConfig::new("batch")
            .with_behavior(BehaviorDefinition::new("wander", BehaviorKind::Wander))
            .with_behavior(BehaviorDefinition::new("seek", BehaviorKind::Seek))
            .with_rule(TransitionRule::new("wander", "seek", Condition::HasTarget))
            .with_default("wander");
        Steerer::from_config(&config).unwrap()
    }

    fn agents(steerer: &Steerer) -> Vec<AgentFrame> {
        (0..32)
            .map(|i| {
                let angle = i as f32 * 0.4;
                let mut frame = AgentFrame::new(steerer.spawn(i), Vec2::from_angle(angle) * 8.0);
                if i % 3 == 0 {
                    frame.target = Some(Vec2::ZERO);
                    frame.facts = Facts::default().with_target(8.0);
                }
                frame
            })
            .collect()
    }

    fn run(steerer: &Steerer, noise: &NoiseBank, ticks: usize) -> Vec<AgentFrame> {
        let obstacles = [
            Obstacle::new(Vec2::new(2.0, 0.0), 1.0),
            Obstacle::new(Vec2::new(-3.0, 3.0), 1.5),
        ];
        let mut frames = agents(steerer);
        let dt = 1.0 / 30.0;
        for tick in 0..ticks {
            let outputs = tick_all(steerer, &mut frames, &obstacles, noise, dt, tick as f32 * dt);
            for (frame, output) in frames.iter_mut().zip(&outputs) {
                frame.advance(output, dt);
            }
        }
        frames
    }

    #[test]
    fn test_parallel_batch_is_deterministic() {
        let steerer = steerer();
        let mut noise = NoiseBank::new();
        noise.prepare(0..32);

        let a = run(&steerer, &noise, 60);
        let b = run(&steerer, &noise, 60);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.state, y.state);
        }
    }

    #[test]
    fn test_batch_matches_sequential_ticks() {
        let steerer = steerer();
        let noise = NoiseBank::new();
        let obstacles = [Obstacle::new(Vec2::new(1.0, 1.0), 0.5)];

        let mut batch = agents(&steerer);
        let mut sequential = batch.clone();
        let outputs = tick_all(&steerer, &mut batch, &obstacles, &noise, 0.1, 0.0);

        for (i, frame) in sequential.iter_mut().enumerate() {
            let input = SteeringInput::new(frame.position, &obstacles, 0.1, 0.0)
                .with_target(frame.target)
                .with_home(frame.home);
            let out = steerer.tick(&mut frame.state, &input, &frame.facts, None, &noise);
            assert_eq!(out.velocity, outputs[i].velocity);
            assert_eq!(frame.state, batch[i].state);
        }
    }

    #[test]
    fn test_events_are_published_per_agent() {
        let steerer = steerer();
        let noise = NoiseBank::new();
        let mut frames = agents(&steerer);
        let outputs = tick_all(&steerer, &mut frames, &[], &noise, 0.1, 0.0);

        let mut queue = EventQueue::new();
        publish_events(&outputs, &mut queue);
        queue.swap();

        let changed: Vec<usize> = queue
            .iter()
            .filter(|e| matches!(e.event, SteeringEvent::BehaviorChanged { .. }))
            .map(|e| e.agent)
            .collect();
        let expected: Vec<usize> = (0..32).filter(|i| i % 3 == 0).collect();
        assert_eq!(changed, expected);
    }
}
