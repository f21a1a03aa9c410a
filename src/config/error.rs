//! Configuration Error Types
//!
//! Errors raised while loading or validating worker configuration. All of them
//! are fatal: the worker refuses to enter its poll loop with a bad configuration.

use crate::constants::error_codes;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The activity has no name
    #[error("Activity 'name' is not provided or empty")]
    MissingActivityName,

    /// The activity has no version
    #[error("Activity 'version' is not provided or empty")]
    MissingActivityVersion,

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Configuration file or environment layer could not be loaded
    #[error("Failed to load configuration from '{source_name}': {error}")]
    LoadError { source_name: String, error: String },

    /// Loaded configuration could not be deserialized into the expected shape
    #[error("Configuration parse error: {error}")]
    ParseError { error: String },
}

impl ConfigurationError {
    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn load_error<E: std::fmt::Display>(source_name: impl Into<String>, error: E) -> Self {
        Self::LoadError {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingActivityName => error_codes::NO_ACTIVITY_NAME,
            Self::MissingActivityVersion => error_codes::NO_ACTIVITY_VERSION,
            _ => error_codes::CONFIG_ERROR,
        }
    }
}

impl From<::config::ConfigError> for ConfigurationError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigurationError::ParseError {
            error: err.to_string(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
