//! Heading and speed smoothing
//!
//! The solved direction is integrated in angle space rather than by lerping
//! vectors: lerping two nearly opposite unit vectors passes through zero,
//! while an angle lerp always rotates through a well-defined arc.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::math::{angle_of, from_angle, lerp_angle, normalize_or_zero, smoothing_factor};
use super::solver::Solution;

/// Smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Cruise speed at full confidence
    pub base_speed: f32,
    /// Fraction of base speed kept even at low confidence
    pub min_speed_bias: f32,
    /// Heading convergence rate (1/s)
    pub turn_rate: f32,
    /// Speed convergence rate (1/s)
    pub speed_rate: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            base_speed: 3.0,
            min_speed_bias: 0.25,
            turn_rate: 8.0,
            speed_rate: 4.0,
        }
    }
}

/// Rotate `current` toward `target` along the shortest arc.
///
/// Always returns a unit vector. Zero `current` snaps to `target`; zero
/// `target` keeps `current`; if both are zero the result is +X.
#[must_use]
pub fn smooth_heading(current: Vec2, target: Vec2, rate: f32, dt: f32) -> Vec2 {
    let current = normalize_or_zero(current);
    let target = normalize_or_zero(target);
    match (current == Vec2::ZERO, target == Vec2::ZERO) {
        (true, true) => Vec2::X,
        (true, false) => target,
        (false, true) => current,
        (false, false) => {
            let t = smoothing_factor(rate, dt);
            let angle = lerp_angle(angle_of(current), angle_of(target), t);
            let heading = normalize_or_zero(from_angle(angle));
            if heading == Vec2::ZERO { current } else { heading }
        }
    }
}

/// Move `current` toward `target` exponentially.
#[must_use]
pub fn smooth_speed(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let t = smoothing_factor(rate, dt);
    let next = current + (target - current) * t;
    if next.is_finite() { next.max(0.0) } else { 0.0 }
}

/// Speed the agent should settle at for a given solve confidence.
#[must_use]
pub fn target_speed(base_speed: f32, min_speed_bias: f32, magnitude: f32) -> f32 {
    let bias = min_speed_bias.clamp(0.0, 1.0);
    let confidence = magnitude.clamp(0.0, 1.0);
    base_speed.max(0.0) * (bias + (1.0 - bias) * confidence)
}

/// Integrated heading and speed after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    /// Unit heading
    pub heading: Vec2,
    /// Non-negative speed
    pub speed: f32,
}

impl Smoothed {
    /// `heading * speed`
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.heading * self.speed
    }
}

/// Integrate a solution into heading and speed.
///
/// A hold solution keeps the heading and decelerates toward zero.
/// `speed_scale` multiplies the cruise speed (speed variation noise).
#[must_use]
pub fn integrate(
    heading: Vec2,
    speed: f32,
    solution: &Solution,
    params: &SmoothingParams,
    speed_scale: f32,
    dt: f32,
) -> Smoothed {
    if solution.is_hold() {
        return Smoothed {
            heading: smooth_heading(heading, Vec2::ZERO, params.turn_rate, dt),
            speed: smooth_speed(speed, 0.0, params.speed_rate, dt),
        };
    }

    let base = params.base_speed * speed_scale.max(0.0);
    let goal = target_speed(base, params.min_speed_bias, solution.magnitude);
    Smoothed {
        heading: smooth_heading(heading, solution.direction, params.turn_rate, dt),
        speed: smooth_speed(speed, goal, params.speed_rate, dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn solution(direction: Vec2, magnitude: f32) -> Solution {
        Solution {
            direction,
            magnitude,
            slot: Some(0),
            offset: 0.0,
        }
    }

    #[test]
    fn test_heading_converges() {
        let mut heading = Vec2::X;
        for _ in 0..200 {
            heading = smooth_heading(heading, Vec2::Y, 8.0, 0.016);
            assert!((heading.length() - 1.0).abs() < 1e-5);
        }
        assert!((heading - Vec2::Y).length() < 1e-3);
    }

    #[test]
    fn test_heading_near_reversal_is_stable() {
        // Exactly opposite: a vector lerp would pass through zero
        let heading = smooth_heading(Vec2::X, -Vec2::X, 8.0, 0.05);
        assert!((heading.length() - 1.0).abs() < 1e-5);
        assert!(heading.dot(Vec2::X) < 1.0);
    }

    #[test]
    fn test_heading_crosses_seam() {
        let from = from_angle(PI - 0.1);
        let to = from_angle(-PI + 0.1);
        let heading = smooth_heading(from, to, 1000.0, 1.0);
        assert!((heading - to).length() < 1e-3);
        // Half step stays on the far side of the circle
        let half = smooth_heading(from, to, 0.5_f32.ln().abs(), 1.0);
        assert!(half.x < -0.99);
    }

    #[test]
    fn test_heading_degenerate_inputs() {
        assert_eq!(smooth_heading(Vec2::ZERO, Vec2::ZERO, 5.0, 0.1), Vec2::X);
        assert_eq!(smooth_heading(Vec2::ZERO, Vec2::Y, 5.0, 0.1), Vec2::Y);
        assert_eq!(smooth_heading(Vec2::Y, Vec2::ZERO, 5.0, 0.1), Vec2::Y);
    }

    #[test]
    fn test_target_speed_min_bias() {
        assert!((target_speed(4.0, 0.25, 0.0) - 1.0).abs() < 1e-6);
        assert!((target_speed(4.0, 0.25, 1.0) - 4.0).abs() < 1e-6);
        assert!((target_speed(4.0, 0.25, 7.0) - 4.0).abs() < 1e-6);
        assert!((target_speed(4.0, 0.25, 0.5) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_integrate_accelerates_and_turns() {
        let params = SmoothingParams::default();
        let mut heading = Vec2::X;
        let mut speed = 0.0;
        for _ in 0..300 {
            let next = integrate(heading, speed, &solution(Vec2::Y, 1.0), &params, 1.0, 0.016);
            heading = next.heading;
            speed = next.speed;
        }
        assert!((speed - params.base_speed).abs() < 0.01);
        assert!((heading - Vec2::Y).length() < 1e-3);
    }

    #[test]
    fn test_hold_decelerates_and_keeps_heading() {
        let params = SmoothingParams::default();
        let next = integrate(Vec2::Y, 3.0, &Solution::HOLD, &params, 1.0, 0.1);
        assert_eq!(next.heading, Vec2::Y);
        assert!(next.speed < 3.0);
        assert!(next.speed >= 0.0);
    }

    #[test]
    fn test_speed_scale() {
        let params = SmoothingParams::default();
        let slow = integrate(Vec2::X, 0.0, &solution(Vec2::X, 1.0), &params, 0.5, 10.0);
        assert!((slow.speed - params.base_speed * 0.5).abs() < 1e-3);
        assert!((slow.velocity() - Vec2::X * slow.speed).length() < 1e-6);
    }
}
