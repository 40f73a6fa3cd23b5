//! Errors for configuration loading and validation
//!
//! Per-tick steering never fails; only building a behavior library or
//! loading a config file can.

use thiserror::Error;

/// Errors that can occur while loading or validating steering configuration
#[derive(Debug, Error)]
pub enum SteeringError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    /// A behavior id that no definition provides
    #[error("Unknown behavior `{0}`")]
    UnknownBehavior(String),
    /// Two definitions share an id
    #[error("Duplicate behavior `{0}`")]
    DuplicateBehavior(String),
    /// A parameter outside its valid range
    #[error("Invalid parameter `{name}` on behavior `{behavior}`: {reason}")]
    InvalidParameter {
        /// Behavior carrying the parameter
        behavior: String,
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// A malformed transition rule
    #[error("Invalid transition rule #{index}: {reason}")]
    InvalidRule {
        /// Position of the rule in its list
        index: usize,
        /// What is wrong with it
        reason: String,
    },
}

/// Convenience alias for results carrying [`SteeringError`].
pub type SteeringResult<T> = Result<T, SteeringError>;
