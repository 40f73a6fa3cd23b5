//! Debug and statistics module

use std::collections::VecDeque;
use std::time::Duration;

use crate::agent::TickOutput;
use crate::steering::TurnSide;

/// Rolling steering statistics over recent agent ticks
#[derive(Debug)]
pub struct SteeringStats {
    /// Solve magnitude history for averaging
    magnitudes: VecDeque<f32>,
    /// Batch time history
    batch_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Total agent ticks recorded
    total_ticks: u64,
    /// Ticks that solved to hold
    holds: u64,
    /// Ticks with a deadlock side engaged
    deadlocked: u64,
    /// Behavior changes
    transitions: u64,
    /// Ticks spent blending
    blending: u64,
}

impl SteeringStats {
    /// Create a new stats tracker
    pub fn new() -> Self {
        Self::with_window(240)
    }

    /// Create a tracker averaging over the last `max_samples` samples
    pub fn with_window(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            magnitudes: VecDeque::with_capacity(max_samples),
            batch_times: VecDeque::with_capacity(max_samples),
            max_samples,
            total_ticks: 0,
            holds: 0,
            deadlocked: 0,
            transitions: 0,
            blending: 0,
        }
    }

    /// Record one agent tick
    pub fn record(&mut self, output: &TickOutput) {
        self.total_ticks += 1;
        if output.solution.is_hold() {
            self.holds += 1;
        }
        if output.deadlock_side != TurnSide::None {
            self.deadlocked += 1;
        }
        if output.transition.is_some() {
            self.transitions += 1;
        }
        if output.blend_progress < 1.0 {
            self.blending += 1;
        }

        if self.magnitudes.len() >= self.max_samples {
            self.magnitudes.pop_front();
        }
        self.magnitudes.push_back(output.solution.magnitude);
    }

    /// Record every output of a batch
    pub fn record_batch(&mut self, outputs: &[TickOutput], elapsed: Duration) {
        for output in outputs {
            self.record(output);
        }
        if self.batch_times.len() >= self.max_samples {
            self.batch_times.pop_front();
        }
        self.batch_times.push_back(elapsed);
    }

    /// Average solve magnitude over the window
    pub fn avg_magnitude(&self) -> f32 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        self.magnitudes.iter().sum::<f32>() / self.magnitudes.len() as f32
    }

    /// Average batch time in milliseconds
    pub fn avg_batch_time_ms(&self) -> f32 {
        if self.batch_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.batch_times.iter().sum();
        total.as_secs_f32() * 1000.0 / self.batch_times.len() as f32
    }

    /// Share of ticks that held
    pub fn hold_ratio(&self) -> f32 {
        self.ratio(self.holds)
    }

    /// Share of ticks with a deadlock side engaged
    pub fn deadlock_ratio(&self) -> f32 {
        self.ratio(self.deadlocked)
    }

    /// Share of ticks spent blending
    pub fn blend_ratio(&self) -> f32 {
        self.ratio(self.blending)
    }

    fn ratio(&self, count: u64) -> f32 {
        if self.total_ticks == 0 {
            0.0
        } else {
            count as f32 / self.total_ticks as f32
        }
    }

    /// Total agent ticks recorded
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Total behavior changes recorded
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Ticks: {} | Batch: {:.3}ms | Magnitude: {:.2} | Hold: {:.1}% | Deadlock: {:.1}% | Blend: {:.1}% | Transitions: {}",
            self.total_ticks,
            self.avg_batch_time_ms(),
            self.avg_magnitude(),
            self.hold_ratio() * 100.0,
            self.deadlock_ratio() * 100.0,
            self.blend_ratio() * 100.0,
            self.transitions
        )
    }
}

impl Default for SteeringStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorTransition;
    use crate::steering::Solution;
    use glam::Vec2;
    use smallvec::SmallVec;

    fn output(magnitude: f32, side: TurnSide) -> TickOutput {
        let solution = if magnitude > 0.0 {
            Solution {
                direction: Vec2::X,
                magnitude,
                slot: Some(0),
                offset: 0.0,
            }
        } else {
            Solution::HOLD
        };
        TickOutput {
            velocity: Vec2::ZERO,
            heading: Vec2::X,
            speed: 0.0,
            wander_cursor: 0.0,
            deadlock_side: side,
            solution,
            ray_hits: SmallVec::new(),
            transition: None,
            events: SmallVec::new(),
            path_finished: false,
            blend_progress: 1.0,
        }
    }

    #[test]
    fn test_ratios() {
        let mut stats = SteeringStats::new();
        stats.record(&output(1.0, TurnSide::None));
        stats.record(&output(0.0, TurnSide::None));
        stats.record(&output(0.5, TurnSide::Clockwise));
        let mut changed = output(1.0, TurnSide::None);
        changed.transition = Some(BehaviorTransition {
            from: "a".into(),
            to: "b".into(),
            blend_duration: 0.2,
            at: 0.0,
            manual: false,
        });
        changed.blend_progress = 0.0;
        stats.record(&changed);

        assert_eq!(stats.total_ticks(), 4);
        assert_eq!(stats.transitions(), 1);
        assert!((stats.hold_ratio() - 0.25).abs() < 1e-6);
        assert!((stats.deadlock_ratio() - 0.25).abs() < 1e-6);
        assert!((stats.blend_ratio() - 0.25).abs() < 1e-6);
        assert!((stats.avg_magnitude() - 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_window_rolls() {
        let mut stats = SteeringStats::with_window(2);
        stats.record(&output(1.0, TurnSide::None));
        stats.record(&output(0.0, TurnSide::None));
        stats.record(&output(0.0, TurnSide::None));
        assert_eq!(stats.avg_magnitude(), 0.0);
        assert_eq!(stats.total_ticks(), 3);
    }

    #[test]
    fn test_batch_times_and_format() {
        let mut stats = SteeringStats::new();
        stats.record_batch(&[output(1.0, TurnSide::None)], Duration::from_millis(2));
        stats.record_batch(&[], Duration::from_millis(4));
        assert!((stats.avg_batch_time_ms() - 3.0).abs() < 1e-3);
        assert!(stats.format_stats().contains("Ticks: 1"));
    }
}
