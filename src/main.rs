//! Headless demo driving a small crowd through the steering pipeline

use std::time::Instant;

use context_steering::prelude::*;

const TICK_RATE: f32 = 60.0;
const TICKS: u32 = 600;

/// Demo scenario: a handful of agents with different goals among pillars
struct Demo {
    steerer: Steerer,
    agents: Vec<AgentFrame>,
    obstacles: Vec<Obstacle>,
    noise: NoiseBank,
    events: EventQueue,
    stats: SteeringStats,
}

impl Demo {
    fn new() -> Result<Self, SteeringError> {
        let config = SteeringConfig::from_ron_str(include_str!("../assets/demo.ron"))?;
        log::info!(
            "Loaded steering config '{}' v{} ({} behaviors, {} rules)",
            config.name,
            config.version,
            config.behaviors.len(),
            config.rules.len()
        );
        let steerer = Steerer::from_config(&config)?;

        let mut agents = Vec::new();

        // Wanders until the target gets close, then chases and circles it
        let mut hunter = AgentFrame::new(steerer.spawn(1), Vec2::new(-8.0, 0.0));
        hunter.target = Some(Vec2::new(6.0, 2.0));
        agents.push(hunter);

        // Badly hurt, flees the same target
        let mut runner = AgentFrame::new(steerer.spawn(2), Vec2::new(4.0, 4.0));
        runner.target = Some(Vec2::new(6.0, 2.0));
        runner.facts = Facts::default().with_health(20.0, 100.0);
        agents.push(runner);

        // Walks a patrol route, then heads home
        let mut patrol = AgentFrame::new(steerer.spawn(3), Vec2::new(0.0, -6.0));
        patrol.waypoints = vec![
            Vec2::new(5.0, -6.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(-5.0, 0.0),
        ];
        steerer.force_behavior(&mut patrol.state, "patrol", 0.0, 0.5);
        agents.push(patrol);

        // Just wanders around home
        agents.push(AgentFrame::new(steerer.spawn(4), Vec2::new(0.0, 8.0)));

        let obstacles = vec![
            Obstacle::new(Vec2::new(0.0, 0.0), 1.5),
            Obstacle::new(Vec2::new(3.0, -3.0), 1.0),
            Obstacle::new(Vec2::new(-4.0, 3.0), 1.2),
        ];

        let mut noise = NoiseBank::new();
        noise.prepare(agents.iter().map(|agent| agent.state.noise_seed));

        Ok(Self {
            steerer,
            agents,
            obstacles,
            noise,
            events: EventQueue::new(),
            stats: SteeringStats::new(),
        })
    }

    fn refresh_facts(&mut self) {
        for agent in &mut self.agents {
            agent.facts.has_target = agent.target.is_some();
            agent.facts.distance_to_target =
                agent.target.map(|target| target.distance(agent.position));
            agent.facts.distance_to_home = agent.home.distance(agent.position);
        }
    }

    fn tick(&mut self, index: u32) {
        let dt = 1.0 / TICK_RATE;
        let now = index as f32 * dt;

        self.refresh_facts();

        let start = Instant::now();
        let outputs = tick_all(
            &self.steerer,
            &mut self.agents,
            &self.obstacles,
            &self.noise,
            dt,
            now,
        );
        self.stats.record_batch(&outputs, start.elapsed());

        for (agent, output) in self.agents.iter_mut().zip(&outputs) {
            agent.advance(output, dt);
        }

        publish_events(&outputs, &mut self.events);
        self.events.swap();
        for event in self.events.iter() {
            log::debug!("[t={:.2}] agent {}: {:?}", now, event.agent, event.event);
        }
    }

    fn run(&mut self) {
        for index in 0..TICKS {
            self.tick(index);
        }

        for (index, agent) in self.agents.iter().enumerate() {
            log::info!(
                "Agent {} ended in '{}' at ({:.2}, {:.2})",
                index,
                agent.state.current,
                agent.position.x,
                agent.position.y
            );
        }
        log::info!("{}", self.stats.format_stats());
    }
}

fn main() {
    env_logger::init();
    log::info!("Starting steering demo");

    match Demo::new() {
        Ok(mut demo) => demo.run(),
        Err(e) => eprintln!("Steering demo error: {}", e),
    }
}
