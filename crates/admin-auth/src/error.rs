//! Authentication errors.
//!
//! A bad or missing cookie is not an error; see
//! [`CookieAuthenticator::validate`](crate::CookieAuthenticator::validate).

use admin_database::DatabaseError;
use site_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Site configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
