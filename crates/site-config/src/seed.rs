//! Initial configuration for a brand-new database.

use crate::keys::{ConfigKey, PathKey, PASSWORD_UNSET};
use crate::ConfigResult;
use admin_database::{migrations, queries, revision, Session, TxMode};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

const SECRET_LEN: usize = 32;
const SUFFIX_LEN: usize = 8;
const DEFAULT_AUTH_WINDOW_MINUTES: u32 = 1440;
const DEFAULT_AUTH_COST: u32 = 10;

/// Random HMAC secret for auth cookies.
pub fn generate_secret() -> String {
    random_alphanumeric(SECRET_LEN)
}

/// Random cookie-name suffix.
pub fn generate_suffix() -> String {
    random_alphanumeric(SUFFIX_LEN)
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn default_path(key: PathKey) -> &'static str {
    match key {
        PathKey::Root => "/",
        PathKey::Admin => "/admin",
        PathKey::Post => "/p",
        PathKey::Tag => "/t",
        PathKey::Feed => "/feed.xml",
        PathKey::Archive => "/archive",
        PathKey::Search => "/search",
        PathKey::Static => "/static",
    }
}

/// A full set of configuration rows to install into an empty database.
#[derive(Clone)]
pub struct ConfigSeed {
    entries: Vec<(ConfigKey, String)>,
}

impl ConfigSeed {
    /// Defaults plus fresh random secret, suffix and initial revision.
    pub fn generate() -> Self {
        let epoch = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);

        let mut entries = vec![
            (ConfigKey::Epoch, epoch.to_string()),
            (
                ConfigKey::Revision,
                revision::format_hex(revision::initial()),
            ),
            (
                ConfigKey::AuthWindowMinutes,
                DEFAULT_AUTH_WINDOW_MINUTES.to_string(),
            ),
            (ConfigKey::AuthCost, DEFAULT_AUTH_COST.to_string()),
            (ConfigKey::AuthSuffix, generate_suffix()),
            (ConfigKey::AuthSecret, generate_secret()),
            (ConfigKey::PasswordHash, PASSWORD_UNSET.to_string()),
        ];
        entries.extend(
            PathKey::ALL
                .into_iter()
                .map(|key| (ConfigKey::Path(key), default_path(key).to_string())),
        );

        Self { entries }
    }

    /// Replace the value of one key.
    pub fn with(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        }
        self
    }

    /// Value of one key in the seed.
    pub fn value(&self, key: ConfigKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check every value with the same rules the cache applies on load.
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, value) in &self.entries {
            key.validate(value.as_bytes())?;
        }
        Ok(())
    }

    /// Create the schema and insert the seed in one `W` work block.
    pub fn install(&self, session: &mut Session) -> ConfigResult<()> {
        self.validate()?;

        session.work(TxMode::Write, |s| -> ConfigResult<()> {
            migrations::run_migrations(s.connection())?;
            for (key, value) in &self.entries {
                queries::insert_config_value(s.connection(), key.name(), value)?;
            }
            Ok(())
        })?;

        info!(
            path = %session.path().display(),
            revision = self.value(ConfigKey::Revision).unwrap_or_default(),
            "Installed site configuration"
        );
        Ok(())
    }
}
