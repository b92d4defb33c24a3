//! Site settings stored in the `config` table.
//!
//! [`ConfigCache::load`] reads the whole table in one read-only work block,
//! validates every recognized key and hands back a plain value. After that
//! nothing here touches the database again.
//!
//! ```ignore
//! let cache = ConfigCache::load(&mut session)?;
//! let window = cache.auth_window_minutes();
//! let feed = cache.path(PathKey::Feed);
//! ```

mod cache;
mod error;
mod keys;
mod seed;

pub use cache::ConfigCache;
pub use error::{ConfigError, ConfigResult};
pub use keys::{ConfigKey, ConfigValue, PathKey, PASSWORD_UNSET};
pub use seed::{generate_secret, generate_suffix, ConfigSeed};
