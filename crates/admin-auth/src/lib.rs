//! Admin authentication by signed cookie.
//!
//! This crate provides:
//! - [`AuthToken`]: the `<hex minute>|<hex HMAC-MD5>` cookie payload
//! - [`CookieAuthenticator`]: issue, validate and cancel the cookie, seeded
//!   from a loaded [`site_config::ConfigCache`]
//! - [`rotate_secret`]: replace the signing secret, logging out every client
//!
//! There is no server-side session store. A token is valid while its minute
//! lies inside the inactivity window and its signature matches the current
//! secret.

mod authenticator;
mod cookie;
mod error;
mod rotation;
mod token;

pub use authenticator::CookieAuthenticator;
pub use cookie::{cookie_pairs, SetCookie};
pub use error::{AuthError, AuthResult};
pub use rotation::rotate_secret;
pub use token::AuthToken;
