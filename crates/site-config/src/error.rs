//! Site configuration errors.

use crate::ConfigKey;
use admin_database::DatabaseError;
use thiserror::Error;

/// Why the site configuration could not be loaded or written.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A recognized key has no row
    #[error("Missing config key: {0}")]
    Missing(ConfigKey),

    /// A recognized key has more than one row
    #[error("Duplicate config key: {0}")]
    Duplicate(ConfigKey),

    /// A recognized key has an invalid value
    #[error("Malformed value for config key {key}: {reason}")]
    Malformed { key: ConfigKey, reason: String },

    /// A key name that is not part of the site configuration
    #[error("Unknown config key: {0:?}")]
    Unknown(String),
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
