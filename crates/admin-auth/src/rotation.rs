//! Global logout.

use crate::AuthResult;
use admin_database::{queries, Session, TxMode};
use site_config::{generate_secret, ConfigError, ConfigKey};
use tracing::info;

/// Replace the cookie signing secret with a fresh random one.
///
/// Runs in a `W` work block, so the revision is not bumped. Every token
/// issued before the rotation fails validation once the configuration is
/// reloaded.
pub fn rotate_secret(session: &mut Session) -> AuthResult<()> {
    let key = ConfigKey::AuthSecret;
    let secret = generate_secret();

    session.work(TxMode::Write, |s| -> AuthResult<()> {
        match queries::update_config_value(s.connection(), key.name(), &secret)? {
            1 => Ok(()),
            0 => Err(ConfigError::Missing(key).into()),
            _ => Err(ConfigError::Duplicate(key).into()),
        }
    })?;

    info!("Rotated auth secret");
    Ok(())
}
