//! Steering configuration serialization and validation
//!
//! A [`SteeringConfig`] bundles behavior definitions and transition rules.
//! It loads from RON (Rusty Object Notation) or JSON and is validated as a
//! whole before a library is built from it.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::error::{SteeringError, SteeringResult};
use crate::behavior::{BehaviorDefinition, BehaviorId, BehaviorLibrary, RuleSource, TransitionRule};

/// Behaviors and rules for one agent archetype (or a whole game).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringConfig {
    /// Config name
    pub name: String,
    /// Config version for compatibility
    pub version: u32,
    /// Behavior new agents start in
    #[serde(default)]
    pub default_behavior: Option<BehaviorId>,
    /// Behavior definitions
    pub behaviors: Vec<BehaviorDefinition>,
    /// Transition rules in declaration order
    #[serde(default)]
    pub rules: Vec<TransitionRule>,
}

impl SteeringConfig {
    /// Create a new empty config
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            default_behavior: None,
            behaviors: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Add a behavior definition
    #[must_use]
    pub fn with_behavior(mut self, definition: BehaviorDefinition) -> Self {
        self.behaviors.push(definition);
        self
    }

    /// Add a transition rule
    #[must_use]
    pub fn with_rule(mut self, rule: TransitionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the starting behavior
    #[must_use]
    pub fn with_default(mut self, id: impl Into<BehaviorId>) -> Self {
        self.default_behavior = Some(id.into());
        self
    }

    /// Starting behavior: the configured default, else the first definition.
    #[must_use]
    pub fn initial_behavior(&self) -> Option<&BehaviorId> {
        self.default_behavior
            .as_ref()
            .or_else(|| self.behaviors.first().map(|definition| &definition.id))
    }

    /// Check definitions, rule references and timings.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> SteeringResult<()> {
        let mut ids = FxHashSet::default();
        for definition in &self.behaviors {
            definition.validate()?;
            if !ids.insert(definition.id.as_str()) {
                return Err(SteeringError::DuplicateBehavior(definition.id.to_string()));
            }
        }

        if let Some(default) = &self.default_behavior
            && !ids.contains(default.as_str())
        {
            return Err(SteeringError::UnknownBehavior(default.to_string()));
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if let RuleSource::Behavior(from) = &rule.from
                && !ids.contains(from.as_str())
            {
                return Err(SteeringError::UnknownBehavior(from.to_string()));
            }
            if !ids.contains(rule.to.as_str()) {
                return Err(SteeringError::UnknownBehavior(rule.to.to_string()));
            }
            if !(rule.blend_duration >= 0.0 && rule.blend_duration.is_finite()) {
                return Err(SteeringError::InvalidRule {
                    index,
                    reason: format!(
                        "blend_duration {} must be finite and >= 0",
                        rule.blend_duration
                    ),
                });
            }
            if !(rule.cooldown >= 0.0 && rule.cooldown.is_finite()) {
                return Err(SteeringError::InvalidRule {
                    index,
                    reason: format!("cooldown {} must be finite and >= 0", rule.cooldown),
                });
            }
        }
        Ok(())
    }

    /// Validate and build the shared behavior library.
    ///
    /// # Errors
    ///
    /// Fails if [`validate`](Self::validate) does.
    pub fn library(&self) -> SteeringResult<BehaviorLibrary> {
        self.validate()?;
        BehaviorLibrary::from_definitions(self.behaviors.iter().cloned())
    }

    /// Parse a config from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_ron_str(text: &str) -> SteeringResult<Self> {
        ron::from_str(text).map_err(|e| SteeringError::Deserialize(e.to_string()))
    }

    /// Render the config as pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> SteeringResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SteeringError::Serialize(e.to_string()))
    }

    /// Parse a config from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_json_str(text: &str) -> SteeringResult<Self> {
        serde_json::from_str(text).map_err(|e| SteeringError::Deserialize(e.to_string()))
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> SteeringResult<()> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> SteeringResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save the config to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> SteeringResult<()> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| SteeringError::Serialize(e.to_string()))?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load a config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> SteeringResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
