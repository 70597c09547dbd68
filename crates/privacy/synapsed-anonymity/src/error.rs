//! Error types for the Synapsed Anonymity engine
//!
//! Only two conditions are genuine faults of the optimization itself: a raw
//! value the hierarchy does not cover (a data fault) and a generalization step
//! that does not move a level upwards (an internal fault). Everything else here
//! guards construction and configuration. Running out of generalization room is
//! normal control flow and never surfaces as an error.

use thiserror::Error;

/// Result type for anonymization operations
pub type Result<T> = std::result::Result<T, AnonymityError>;

/// Errors that can occur while building or running the anonymizer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnonymityError {
    /// Value is not covered by the attribute's hierarchy
    #[error("Unknown value '{value}' for attribute '{attribute}'")]
    UnknownValue { attribute: String, value: String },

    /// A proposed level does not advance the current one
    #[error("Invalid level for '{attribute}': proposed {proposed}, current {current}")]
    InvalidLevel {
        attribute: String,
        current: usize,
        proposed: usize,
    },

    /// Level beyond the suppression level of a hierarchy
    #[error("Level {level} out of range for '{attribute}' (max {max})")]
    LevelOutOfRange {
        attribute: String,
        level: usize,
        max: usize,
    },

    /// Attribute has no registered hierarchy
    #[error("Unknown attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    /// Attribute registered twice
    #[error("Duplicate attribute: {attribute}")]
    DuplicateAttribute { attribute: String },

    /// Hierarchy definition breaks a structural rule
    #[error("Invalid hierarchy for '{attribute}': {message}")]
    InvalidHierarchy { attribute: String, message: String },

    /// Record cannot be admitted into a dataset
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },
}

impl AnonymityError {
    /// Create an unknown value error
    pub fn unknown_value(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an invalid (regressing) level error
    pub fn invalid_level(attribute: impl Into<String>, current: usize, proposed: usize) -> Self {
        Self::InvalidLevel {
            attribute: attribute.into(),
            current,
            proposed,
        }
    }

    /// Create a level out of range error
    pub fn level_out_of_range(attribute: impl Into<String>, level: usize, max: usize) -> Self {
        Self::LevelOutOfRange {
            attribute: attribute.into(),
            level,
            max,
        }
    }

    /// Create an unknown attribute error
    pub fn unknown_attribute(attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid hierarchy error
    pub fn invalid_hierarchy(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHierarchy {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create an invalid record error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Faults caused by the input data rather than the engine
    pub fn is_data_fault(&self) -> bool {
        matches!(
            self,
            AnonymityError::UnknownValue { .. } | AnonymityError::InvalidRecord { .. }
        )
    }

    /// Internal-consistency faults of the optimizer
    pub fn is_internal_fault(&self) -> bool {
        matches!(
            self,
            AnonymityError::InvalidLevel { .. } | AnonymityError::LevelOutOfRange { .. }
        )
    }
}

impl From<serde_json::Error> for AnonymityError {
    fn from(err: serde_json::Error) -> Self {
        AnonymityError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AnonymityError {
    fn from(err: toml::de::Error) -> Self {
        AnonymityError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AnonymityError {
    fn from(err: std::io::Error) -> Self {
        AnonymityError::Io {
            message: err.to_string(),
        }
    }
}
