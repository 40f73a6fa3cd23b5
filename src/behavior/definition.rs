//! Shared behavior definitions
//!
//! A [`BehaviorDefinition`] is the immutable tuning for one behavior id.
//! Many agents point at the same definition through a [`BehaviorLibrary`];
//! per-agent tweaks go through [`ParamOverrides`], a flat name → value map
//! shallow-merged on top at evaluation time.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{SteeringError, SteeringResult};
use crate::steering::{
    DeadlockParams, MAX_RESOLUTION, MIN_RESOLUTION, SensorParams, SmoothingParams, SolverParams,
    StrafeParams,
};

/// Identifier of a behavior (state) in the library and state machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(String);

impl BehaviorId {
    /// Create an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BehaviorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BehaviorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for BehaviorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which shaping logic a behavior runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorKind {
    /// No interest; the agent coasts to a stop
    #[default]
    Idle,
    /// Move toward the target
    Seek,
    /// Move away from the target
    Flee,
    /// Circle the target inside a range band
    Strafe,
    /// Noise-driven roaming, optionally leashed to home
    Wander,
    /// Return to home when outside the leash
    Tether,
    /// Walk the host-supplied waypoint list
    FollowPath,
}

/// Wander knobs stored on a definition. The seed comes from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderTuning {
    /// Maximum deviation from forward, radians
    pub angle_range: f32,
    /// Interest scale
    pub weight: f32,
    /// Noise cursor advance per second
    pub rate: f32,
}

impl Default for WanderTuning {
    fn default() -> Self {
        Self {
            angle_range: std::f32::consts::FRAC_PI_2,
            weight: 1.0,
            rate: 0.5,
        }
    }
}

/// Numeric tuning for one behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorParams {
    /// Context map slot count
    pub resolution: usize,
    /// Heading and speed smoothing
    pub smoothing: SmoothingParams,
    /// Raycast sensor
    pub sensor: SensorParams,
    /// Use the cheap proximity sensor instead of raycasts
    pub proximity_sensing: bool,
    /// Re-sense every N ticks, reusing cached hits in between
    pub sense_interval: u32,
    /// Solver
    pub solver: SolverParams,
    /// Deadlock resolver
    pub deadlock: DeadlockParams,
    /// Seek interest scale
    pub seek_weight: f32,
    /// Flee interest scale
    pub flee_weight: f32,
    /// Strafe band
    pub strafe: StrafeParams,
    /// Wander
    pub wander: WanderTuning,
    /// Free radius around home; 0 disables tethering
    pub leash_radius: f32,
    /// Tether interest scale
    pub tether_weight: f32,
    /// Path lock interest spike; 0 disables path locking
    pub path_lock_boost: f32,
    /// Distance at which a waypoint counts as reached
    pub waypoint_radius: f32,
    /// Amplitude of noise-driven speed variation, fraction of base speed
    pub speed_noise: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            resolution: 16,
            smoothing: SmoothingParams::default(),
            sensor: SensorParams::default(),
            proximity_sensing: false,
            sense_interval: 1,
            solver: SolverParams::default(),
            deadlock: DeadlockParams::default(),
            seek_weight: 1.0,
            flee_weight: 1.0,
            strafe: StrafeParams::default(),
            wander: WanderTuning::default(),
            leash_radius: 0.0,
            tether_weight: 1.0,
            path_lock_boost: 2.0,
            waypoint_radius: 0.5,
            speed_noise: 0.0,
        }
    }
}

impl BehaviorParams {
    /// Names accepted by [`set`](Self::set).
    pub const NAMES: &'static [&'static str] = &[
        "resolution",
        "speed",
        "min_speed_bias",
        "turn_rate",
        "speed_rate",
        "sensor_range",
        "agent_radius",
        "dilation_epsilon",
        "dilation_half_angle",
        "dilation_attenuation",
        "sense_interval",
        "hard_mask",
        "deadlock_threshold",
        "deadlock_bias",
        "seek_weight",
        "flee_weight",
        "strafe_min_range",
        "strafe_max_range",
        "strafe_weight",
        "wander_angle_range",
        "wander_weight",
        "wander_rate",
        "leash_radius",
        "tether_weight",
        "path_lock_boost",
        "waypoint_radius",
        "speed_noise",
    ];

    /// Set a parameter by name. Returns `false` for unknown names.
    ///
    /// Values are clamped into their valid range and non-finite values are
    /// ignored. `hard_mask` values of 1.0 or more disable the clamp.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        if !value.is_finite() {
            return Self::NAMES.contains(&name);
        }
        let positive = value.max(0.0);
        let unit = value.clamp(0.0, 1.0);
        match name {
            "resolution" => {
                self.resolution =
                    (positive.round() as usize).clamp(MIN_RESOLUTION, MAX_RESOLUTION);
            }
            "speed" => self.smoothing.base_speed = positive,
            "min_speed_bias" => self.smoothing.min_speed_bias = unit,
            "turn_rate" => self.smoothing.turn_rate = positive,
            "speed_rate" => self.smoothing.speed_rate = positive,
            "sensor_range" => self.sensor.range = positive,
            "agent_radius" => self.sensor.agent_radius = positive,
            "dilation_epsilon" => self.sensor.dilation_epsilon = unit,
            "dilation_half_angle" => self.sensor.dilation_half_angle = positive,
            "dilation_attenuation" => self.sensor.dilation_attenuation = unit,
            "sense_interval" => self.sense_interval = value.round().max(1.0) as u32,
            "hard_mask" => self.solver.hard_mask = (value < 1.0).then_some(positive),
            "deadlock_threshold" => self.deadlock.threshold = unit,
            "deadlock_bias" => self.deadlock.bias = positive,
            "seek_weight" => self.seek_weight = positive,
            "flee_weight" => self.flee_weight = positive,
            "strafe_min_range" => self.strafe.min_range = positive,
            "strafe_max_range" => self.strafe.max_range = positive,
            "strafe_weight" => self.strafe.strafe_weight = positive,
            "wander_angle_range" => self.wander.angle_range = positive,
            "wander_weight" => self.wander.weight = positive,
            "wander_rate" => self.wander.rate = value,
            "leash_radius" => self.leash_radius = positive,
            "tether_weight" => self.tether_weight = positive,
            "path_lock_boost" => self.path_lock_boost = positive,
            "waypoint_radius" => self.waypoint_radius = positive,
            "speed_noise" => self.speed_noise = positive,
            _ => return false,
        }
        true
    }
}

/// Per-agent parameter overrides, applied by name on top of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamOverrides(FxHashMap<String, f32>);

impl ParamOverrides {
    /// Create an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an override.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f32) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Add or replace an override in place.
    pub fn insert(&mut self, name: impl Into<String>, value: f32) {
        self.0.insert(name.into(), value);
    }

    /// Whether there is nothing to override.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every override to `params`. Unknown names are logged and skipped.
    ///
    /// The merged parameters always validate: values are clamped by
    /// [`BehaviorParams::set`] and an inverted strafe band collapses onto its
    /// minimum.
    pub fn apply(&self, behavior: &BehaviorId, params: &mut BehaviorParams) {
        for (name, &value) in &self.0 {
            if !params.set(name, value) {
                log::warn!("Ignoring unknown parameter override `{name}` on behavior `{behavior}`");
            }
        }
        if params.strafe.min_range > params.strafe.max_range {
            log::warn!(
                "Strafe range overrides on behavior `{behavior}` are inverted ({} > {})",
                params.strafe.min_range,
                params.strafe.max_range
            );
            params.strafe.max_range = params.strafe.min_range;
        }
    }
}

/// Immutable tuning for one behavior id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDefinition {
    /// Library key
    pub id: BehaviorId,
    /// Shaping logic
    pub kind: BehaviorKind,
    /// Tuning
    #[serde(default)]
    pub params: BehaviorParams,
}

impl BehaviorDefinition {
    /// Create a definition with default parameters.
    pub fn new(id: impl Into<BehaviorId>, kind: BehaviorKind) -> Self {
        Self {
            id: id.into(),
            kind,
            params: BehaviorParams::default(),
        }
    }

    /// Replace the parameters.
    #[must_use]
    pub fn with_params(mut self, params: BehaviorParams) -> Self {
        self.params = params;
        self
    }

    /// Set one parameter by name, ignoring unknown names.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: f32) -> Self {
        if !self.params.set(name, value) {
            log::warn!("Ignoring unknown parameter `{name}` on behavior `{}`", self.id);
        }
        self
    }

    /// This definition with `overrides` merged on top. Borrows when there is
    /// nothing to merge.
    #[must_use]
    pub fn resolved<'a>(&'a self, overrides: Option<&ParamOverrides>) -> Cow<'a, Self> {
        match overrides {
            Some(overrides) if !overrides.is_empty() => {
                let mut merged = self.clone();
                overrides.apply(&self.id, &mut merged.params);
                Cow::Owned(merged)
            }
            _ => Cow::Borrowed(self),
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::InvalidParameter`] for the first violation.
    pub fn validate(&self) -> SteeringResult<()> {
        let p = &self.params;
        let invalid = |name: &'static str, reason: String| SteeringError::InvalidParameter {
            behavior: self.id.to_string(),
            name,
            reason,
        };

        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&p.resolution) {
            return Err(invalid(
                "resolution",
                format!("{} outside {MIN_RESOLUTION}..={MAX_RESOLUTION}", p.resolution),
            ));
        }
        let non_negative = [
            ("speed", p.smoothing.base_speed),
            ("turn_rate", p.smoothing.turn_rate),
            ("speed_rate", p.smoothing.speed_rate),
            ("sensor_range", p.sensor.range),
            ("agent_radius", p.sensor.agent_radius),
            ("dilation_half_angle", p.sensor.dilation_half_angle),
            ("leash_radius", p.leash_radius),
            ("waypoint_radius", p.waypoint_radius),
            ("speed_noise", p.speed_noise),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(invalid(name, format!("{value} must be finite and >= 0")));
            }
        }
        if !(0.0..=1.0).contains(&p.smoothing.min_speed_bias) {
            return Err(invalid(
                "min_speed_bias",
                format!("{} outside 0..=1", p.smoothing.min_speed_bias),
            ));
        }
        if p.strafe.min_range > p.strafe.max_range {
            return Err(invalid(
                "strafe_min_range",
                format!(
                    "{} exceeds strafe_max_range {}",
                    p.strafe.min_range, p.strafe.max_range
                ),
            ));
        }
        if p.sense_interval == 0 {
            return Err(invalid("sense_interval", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Shared, read-only table of behavior definitions.
#[derive(Debug, Clone, Default)]
pub struct BehaviorLibrary {
    definitions: FxHashMap<BehaviorId, Arc<BehaviorDefinition>>,
}

impl BehaviorLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from definitions, validating each one.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid or duplicate definition.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = BehaviorDefinition>,
    ) -> SteeringResult<Self> {
        let mut library = Self::new();
        for definition in definitions {
            library.insert(definition)?;
        }
        Ok(library)
    }

    /// Validate and add a definition.
    ///
    /// # Errors
    ///
    /// Fails if the definition is invalid or its id is taken.
    pub fn insert(&mut self, definition: BehaviorDefinition) -> SteeringResult<()> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            return Err(SteeringError::DuplicateBehavior(definition.id.to_string()));
        }
        self.definitions
            .insert(definition.id.clone(), Arc::new(definition));
        Ok(())
    }

    /// Look up a definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<BehaviorDefinition>> {
        self.definitions.get(id)
    }

    /// Whether `id` is defined.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterate over all definitions in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BehaviorDefinition>> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_and_unknown() {
        let mut params = BehaviorParams::default();
        assert!(params.set("speed", 7.0));
        assert_eq!(params.smoothing.base_speed, 7.0);
        assert!(params.set("resolution", 200.0));
        assert_eq!(params.resolution, MAX_RESOLUTION);
        assert!(params.set("hard_mask", 1.0));
        assert_eq!(params.solver.hard_mask, None);
        assert!(!params.set("warp_factor", 9.0));
    }

    #[test]
    fn test_every_listed_name_is_settable() {
        let mut params = BehaviorParams::default();
        for name in BehaviorParams::NAMES {
            assert!(params.set(name, 0.5), "{name}");
        }
    }

    #[test]
    fn test_overrides_shallow_merge() {
        let definition = BehaviorDefinition::new("chase", BehaviorKind::Seek)
            .with_param("speed", 4.0)
            .with_param("sensor_range", 8.0);
        let overrides = ParamOverrides::new().with("speed", 6.0).with("bogus", 1.0);

        let merged = definition.resolved(Some(&overrides));
        assert_eq!(merged.params.smoothing.base_speed, 6.0);
        assert_eq!(merged.params.sensor.range, 8.0);
        // Shared definition untouched
        assert_eq!(definition.params.smoothing.base_speed, 4.0);
    }

    #[test]
    fn test_set_clamps_out_of_range_values() {
        let mut params = BehaviorParams::default();
        assert!(params.set("sensor_range", -3.0));
        assert_eq!(params.sensor.range, 0.0);
        assert!(params.set("min_speed_bias", 1.5));
        assert_eq!(params.smoothing.min_speed_bias, 1.0);
        let radius = params.sensor.agent_radius;
        assert!(params.set("agent_radius", f32::NAN));
        assert_eq!(params.sensor.agent_radius, radius);
        assert!(!params.set("warp_factor", f32::INFINITY));
    }

    #[test]
    fn test_bad_overrides_still_validate() {
        let definition = BehaviorDefinition::new("circle", BehaviorKind::Strafe);
        let overrides = ParamOverrides::new()
            .with("sensor_range", -5.0)
            .with("agent_radius", -1.0)
            .with("speed", f32::NAN)
            .with("strafe_min_range", 9.0)
            .with("strafe_max_range", 2.0);

        let merged = definition.resolved(Some(&overrides));
        assert!(merged.validate().is_ok());
        assert_eq!(merged.params.sensor.range, 0.0);
        assert_eq!(merged.params.sensor.agent_radius, 0.0);
        assert_eq!(merged.params.smoothing.base_speed, definition.params.smoothing.base_speed);
        assert_eq!(merged.params.strafe.min_range, 9.0);
        assert_eq!(merged.params.strafe.max_range, 9.0);
    }

    #[test]
    fn test_resolved_borrows_without_overrides() {
        let definition = BehaviorDefinition::new("idle", BehaviorKind::Idle);
        assert!(matches!(definition.resolved(None), Cow::Borrowed(_)));
        assert!(matches!(
            definition.resolved(Some(&ParamOverrides::new())),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let low_res = BehaviorDefinition::new("a", BehaviorKind::Idle).with_params(BehaviorParams {
            resolution: 2,
            ..Default::default()
        });
        assert!(matches!(
            low_res.validate(),
            Err(SteeringError::InvalidParameter {
                name: "resolution",
                ..
            })
        ));

        let mut params = BehaviorParams::default();
        params.sensor.agent_radius = -1.0;
        let negative = BehaviorDefinition::new("b", BehaviorKind::Idle).with_params(params);
        assert!(negative.validate().is_err());

        let band = BehaviorDefinition::new("c", BehaviorKind::Strafe)
            .with_param("strafe_min_range", 5.0)
            .with_param("strafe_max_range", 2.0);
        assert!(band.validate().is_err());

        assert!(BehaviorDefinition::new("d", BehaviorKind::Seek).validate().is_ok());
    }

    #[test]
    fn test_library_rejects_duplicates() {
        let result = BehaviorLibrary::from_definitions([
            BehaviorDefinition::new("idle", BehaviorKind::Idle),
            BehaviorDefinition::new("idle", BehaviorKind::Wander),
        ]);
        assert!(matches!(result, Err(SteeringError::DuplicateBehavior(id)) if id == "idle"));
    }

    #[test]
    fn test_library_lookup() {
        let library = BehaviorLibrary::from_definitions([
            BehaviorDefinition::new("idle", BehaviorKind::Idle),
            BehaviorDefinition::new("flee", BehaviorKind::Flee),
        ])
        .unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.contains("flee"));
        assert_eq!(library.get("flee").unwrap().kind, BehaviorKind::Flee);
        assert!(library.get("dance").is_none());
    }
}
