//! Context-based steering
//!
//! The numerical core: context maps, interest shaping, danger sensing,
//! solving, deadlock breaking and heading smoothing. Every function here is
//! pure or mutates only the map or values passed in.

mod context_map;
mod deadlock;
pub mod math;
mod noise_field;
mod sensor;
mod shaping;
mod smoother;
mod solver;

pub use context_map::{ContextMap, MAX_RESOLUTION, MIN_RESOLUTION};
pub use deadlock::{DeadlockParams, TIE_BREAK_SIDE, TurnSide, flank_offsets, resolve_deadlock};
pub use noise_field::NoiseBank;
pub use sensor::{
    DangerFalloff, Obstacle, RayHit, RayHits, SensorParams, apply_cached, dilate, has_line_of_sight,
    hit_danger, ray_circle, raycast, sense, sense_proximity,
};
pub use shaping::{
    Flee, PathLock, Seek, ShapingBehavior, Strafe, StrafeParams, Tether, Wander, WanderParams, seek,
};
pub use smoother::{Smoothed, SmoothingParams, integrate, smooth_heading, smooth_speed, target_speed};
pub use solver::{
    DEFAULT_HARD_MASK, Solution, SolveMode, SolverParams, parabolic_offset, peak_index, solve,
    solve_masked,
};
