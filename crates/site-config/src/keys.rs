//! The fixed set of site configuration keys and their value formats.

use crate::{ConfigError, ConfigResult};
use admin_database::revision;
use std::fmt;
use std::str::FromStr;

/// Stored in `authpswd` when no admin password has been set.
pub const PASSWORD_UNSET: &str = "*";

const MAX_AUTH_WINDOW_MINUTES: u64 = 525_600;
const MIN_AUTH_COST: u64 = 4;
const MAX_AUTH_COST: u64 = 31;
const MAX_PATH_LEN: usize = 1024;

/// URI paths the site is served under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKey {
    Root,
    Admin,
    Post,
    Tag,
    Feed,
    Archive,
    Search,
    Static,
}

impl PathKey {
    pub const ALL: [PathKey; 8] = [
        PathKey::Root,
        PathKey::Admin,
        PathKey::Post,
        PathKey::Tag,
        PathKey::Feed,
        PathKey::Archive,
        PathKey::Search,
        PathKey::Static,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A recognized row of the `config` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    /// Site creation time, unix seconds.
    Epoch,
    /// The `lastmod` revision counter.
    Revision,
    /// Cookie inactivity window in minutes.
    AuthWindowMinutes,
    /// bcrypt cost for the admin password.
    AuthCost,
    /// Suffix of the auth cookie name.
    AuthSuffix,
    /// HMAC key for auth cookies.
    AuthSecret,
    /// bcrypt hash of the admin password, or [`PASSWORD_UNSET`].
    PasswordHash,
    /// One of the URI paths.
    Path(PathKey),
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 15] = [
        ConfigKey::Epoch,
        ConfigKey::Revision,
        ConfigKey::AuthWindowMinutes,
        ConfigKey::AuthCost,
        ConfigKey::AuthSuffix,
        ConfigKey::AuthSecret,
        ConfigKey::PasswordHash,
        ConfigKey::Path(PathKey::Root),
        ConfigKey::Path(PathKey::Admin),
        ConfigKey::Path(PathKey::Post),
        ConfigKey::Path(PathKey::Tag),
        ConfigKey::Path(PathKey::Feed),
        ConfigKey::Path(PathKey::Archive),
        ConfigKey::Path(PathKey::Search),
        ConfigKey::Path(PathKey::Static),
    ];

    /// Row key in the `config` table.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::Epoch => "epoch",
            ConfigKey::Revision => revision::REVISION_KEY,
            ConfigKey::AuthWindowMinutes => "authlimit",
            ConfigKey::AuthCost => "authcost",
            ConfigKey::AuthSuffix => "authsuffix",
            ConfigKey::AuthSecret => "authsecret",
            ConfigKey::PasswordHash => "authpswd",
            ConfigKey::Path(PathKey::Root) => "path_root",
            ConfigKey::Path(PathKey::Admin) => "path_admin",
            ConfigKey::Path(PathKey::Post) => "path_post",
            ConfigKey::Path(PathKey::Tag) => "path_tag",
            ConfigKey::Path(PathKey::Feed) => "path_feed",
            ConfigKey::Path(PathKey::Archive) => "path_archive",
            ConfigKey::Path(PathKey::Search) => "path_search",
            ConfigKey::Path(PathKey::Static) => "path_static",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Whether the value is a secret that must not be printed.
    pub fn is_sensitive(self) -> bool {
        matches!(self, ConfigKey::AuthSecret | ConfigKey::PasswordHash)
    }

    /// Check a raw stored value and decode it.
    pub fn validate(self, raw: &[u8]) -> ConfigResult<ConfigValue> {
        let malformed = |reason: &str| ConfigError::Malformed {
            key: self,
            reason: reason.to_string(),
        };

        match self {
            ConfigKey::Epoch => {
                let value = decimal(raw, 10)
                    .ok_or_else(|| malformed("expected 1-10 decimal digits"))?;
                if value > u64::from(u32::MAX) {
                    return Err(malformed("out of range"));
                }
                Ok(ConfigValue::Number(value))
            }
            ConfigKey::Revision => {
                let text = std::str::from_utf8(raw).map_err(|_| malformed("not UTF-8"))?;
                let value = revision::parse_hex(text)
                    .ok_or_else(|| malformed("expected 1-8 hex digits"))?;
                Ok(ConfigValue::Number(u64::from(value)))
            }
            ConfigKey::AuthWindowMinutes => {
                let value = decimal(raw, 6).ok_or_else(|| malformed("expected decimal minutes"))?;
                if !(1..=MAX_AUTH_WINDOW_MINUTES).contains(&value) {
                    return Err(malformed("must be between 1 and 525600 minutes"));
                }
                Ok(ConfigValue::Number(value))
            }
            ConfigKey::AuthCost => {
                let value = decimal(raw, 2).ok_or_else(|| malformed("expected a decimal cost"))?;
                if !(MIN_AUTH_COST..=MAX_AUTH_COST).contains(&value) {
                    return Err(malformed("must be between 4 and 31"));
                }
                Ok(ConfigValue::Number(value))
            }
            ConfigKey::AuthSuffix => {
                text_in_charset(raw, 1, 32, |b| b.is_ascii_alphanumeric() || b == b'_')
                    .ok_or_else(|| malformed("expected 1-32 characters of [0-9A-Za-z_]"))
            }
            ConfigKey::AuthSecret => text_in_charset(raw, 16, 128, |b| {
                b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
            })
            .ok_or_else(|| malformed("expected 16-128 characters of [0-9A-Za-z_-]")),
            ConfigKey::PasswordHash => {
                if raw == PASSWORD_UNSET.as_bytes() {
                    return Ok(ConfigValue::Text(PASSWORD_UNSET.to_string()));
                }
                text_in_charset(raw, 1, 128, |b| {
                    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'/' | b'$')
                })
                .ok_or_else(|| malformed("expected a password hash or \"*\""))
            }
            ConfigKey::Path(_) => {
                let text = std::str::from_utf8(raw).map_err(|_| malformed("not UTF-8"))?;
                if !text.starts_with('/') {
                    return Err(malformed("must start with '/'"));
                }
                if text.len() > MAX_PATH_LEN {
                    return Err(malformed("longer than 1024 bytes"));
                }
                if text.chars().any(char::is_control) {
                    return Err(malformed("contains control characters"));
                }
                Ok(ConfigValue::Text(text.to_string()))
            }
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigError::Unknown(s.to_string()))
    }
}

/// A decoded configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(n) => write!(f, "{n}"),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

/// Plain decimal with at most `max_digits` digits.
fn decimal(raw: &[u8], max_digits: usize) -> Option<u64> {
    if raw.is_empty() || raw.len() > max_digits || !raw.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn text_in_charset(
    raw: &[u8],
    min: usize,
    max: usize,
    allowed: impl Fn(u8) -> bool,
) -> Option<ConfigValue> {
    if raw.len() < min || raw.len() > max || !raw.iter().copied().all(allowed) {
        return None;
    }
    // The charset is ASCII, so this cannot fail.
    String::from_utf8(raw.to_vec()).ok().map(ConfigValue::Text)
}
