//! Configuration error types.

use thiserror::Error;

/// Result type for configuration resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while resolving the environment into a [`crate::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment could not be deserialized (e.g. a non-numeric key size).
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    /// A required variable is unset or empty.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable holds a value outside its allowed set.
    #[error("invalid value {value:?} for {name}, expected one of: {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A field failed its validation rule.
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
