//! Request-scoped snapshot of the site configuration.

use crate::keys::{ConfigKey, ConfigValue, PathKey, PASSWORD_UNSET};
use crate::{ConfigError, ConfigResult};
use admin_database::{queries, revision, ConfigRow, Session, TxMode};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Every recognized configuration value, validated.
///
/// Built only through [`ConfigCache::load`] or [`ConfigCache::from_rows`]; a
/// cache with a missing or malformed entry cannot exist.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigCache {
    epoch: u64,
    revision: u32,
    auth_window_minutes: u32,
    auth_cost: u32,
    auth_suffix: String,
    auth_secret: String,
    password_hash: String,
    paths: [String; 8],
}

impl ConfigCache {
    /// Read and validate the whole `config` table in one read-only work block.
    pub fn load(session: &mut Session) -> ConfigResult<Self> {
        let rows = session.work(TxMode::Read, |s| queries::list_config_rows(s.connection()))?;
        Self::from_rows(rows)
    }

    /// Validate raw rows. Unrecognized keys are ignored; a recognized key that
    /// is duplicated, malformed or absent fails the whole load.
    pub fn from_rows(rows: impl IntoIterator<Item = ConfigRow>) -> ConfigResult<Self> {
        let mut values: HashMap<ConfigKey, ConfigValue> = HashMap::new();

        for row in rows {
            let Some(key) = ConfigKey::from_name(&row.key) else {
                debug!(key = %row.key, "Ignoring unrecognized config key");
                continue;
            };
            if values.contains_key(&key) {
                return Err(ConfigError::Duplicate(key));
            }
            let raw = row.value.ok_or_else(|| ConfigError::Malformed {
                key,
                reason: "value is NULL".to_string(),
            })?;
            values.insert(key, key.validate(&raw)?);
        }

        let mut take = |key: ConfigKey| values.remove(&key).ok_or(ConfigError::Missing(key));

        let epoch = number(take(ConfigKey::Epoch)?);
        let revision = narrow(ConfigKey::Revision, number(take(ConfigKey::Revision)?))?;
        let auth_window_minutes = narrow(
            ConfigKey::AuthWindowMinutes,
            number(take(ConfigKey::AuthWindowMinutes)?),
        )?;
        let auth_cost = narrow(ConfigKey::AuthCost, number(take(ConfigKey::AuthCost)?))?;
        let auth_suffix = text(take(ConfigKey::AuthSuffix)?);
        let auth_secret = text(take(ConfigKey::AuthSecret)?);
        let password_hash = text(take(ConfigKey::PasswordHash)?);

        let mut paths: [String; 8] = Default::default();
        for path_key in PathKey::ALL {
            paths[path_key.index()] = text(take(ConfigKey::Path(path_key))?);
        }

        Ok(Self {
            epoch,
            revision,
            auth_window_minutes,
            auth_cost,
            auth_suffix,
            auth_secret,
            password_hash,
            paths,
        })
    }

    /// Value of a key.
    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::Epoch => ConfigValue::Number(self.epoch),
            ConfigKey::Revision => ConfigValue::Number(u64::from(self.revision)),
            ConfigKey::AuthWindowMinutes => {
                ConfigValue::Number(u64::from(self.auth_window_minutes))
            }
            ConfigKey::AuthCost => ConfigValue::Number(u64::from(self.auth_cost)),
            ConfigKey::AuthSuffix => ConfigValue::Text(self.auth_suffix.clone()),
            ConfigKey::AuthSecret => ConfigValue::Text(self.auth_secret.clone()),
            ConfigKey::PasswordHash => ConfigValue::Text(self.password_hash.clone()),
            ConfigKey::Path(path_key) => ConfigValue::Text(self.path(path_key).to_string()),
        }
    }

    /// Value of a key given by name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a configuration key; callers only pass names
    /// they know.
    pub fn get_by_name(&self, name: &str) -> ConfigValue {
        match ConfigKey::from_name(name) {
            Some(key) => self.get(key),
            None => panic!("unknown config key {name:?}"),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Revision at the time the cache was loaded.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Weak ETag for [`revision`](Self::revision).
    pub fn etag(&self) -> String {
        revision::etag(self.revision)
    }

    pub fn auth_window_minutes(&self) -> u32 {
        self.auth_window_minutes
    }

    pub fn auth_cost(&self) -> u32 {
        self.auth_cost
    }

    pub fn auth_suffix(&self) -> &str {
        &self.auth_suffix
    }

    pub fn auth_secret(&self) -> &str {
        &self.auth_secret
    }

    /// The stored password hash, `None` if no password is set.
    pub fn password_hash(&self) -> Option<&str> {
        if self.password_hash == PASSWORD_UNSET {
            None
        } else {
            Some(&self.password_hash)
        }
    }

    pub fn path(&self, key: PathKey) -> &str {
        &self.paths[key.index()]
    }
}

impl fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCache")
            .field("epoch", &self.epoch)
            .field("revision", &revision::format_hex(self.revision))
            .field("auth_window_minutes", &self.auth_window_minutes)
            .field("auth_cost", &self.auth_cost)
            .field("auth_suffix", &self.auth_suffix)
            .field("auth_secret", &"<redacted>")
            .field("password_set", &self.password_hash().is_some())
            .field("paths", &self.paths)
            .finish()
    }
}

fn number(value: ConfigValue) -> u64 {
    match value {
        ConfigValue::Number(n) => n,
        ConfigValue::Text(_) => unreachable!("numeric keys validate to numbers"),
    }
}

fn text(value: ConfigValue) -> String {
    match value {
        ConfigValue::Text(s) => s,
        ConfigValue::Number(_) => unreachable!("text keys validate to text"),
    }
}

fn narrow(key: ConfigKey, value: u64) -> ConfigResult<u32> {
    u32::try_from(value).map_err(|_| ConfigError::Malformed {
        key,
        reason: "out of range".to_string(),
    })
}
