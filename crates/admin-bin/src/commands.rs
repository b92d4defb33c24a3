//! Operator subcommands.

use std::io::Write;
use std::path::PathBuf;

use admin_auth::{rotate_secret, CookieAuthenticator};
use admin_database::{queries, revision, DatabaseResult, Session, SessionOptions, TxMode};
use anyhow::{bail, Context as _};
use site_config::{ConfigCache, ConfigError, ConfigKey, ConfigSeed};
use tracing::info;

/// Where and how to open the database.
pub struct Context {
    pub database: PathBuf,
    pub options: SessionOptions,
}

impl Context {
    pub fn open_session(&self) -> DatabaseResult<Session> {
        Session::connect_with(&self.database, false, &self.options)
    }

    pub fn open(&self) -> anyhow::Result<Session> {
        self.open_session()
            .with_context(|| format!("opening {}", self.database.display()))
    }
}

pub fn init(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let mut session = Session::connect_with(&ctx.database, true, &ctx.options)
        .with_context(|| format!("creating {}", ctx.database.display()))?;
    ConfigSeed::generate().install(&mut session)?;
    let current = revision::current(&mut session)?;
    session.close()?;

    info!(path = %ctx.database.display(), "Initialized database");
    writeln!(out, "created {}", ctx.database.display())?;
    writeln!(out, "etag {}", revision::etag(current))?;
    Ok(())
}

pub fn show(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let mut session = ctx.open()?;
    let cache = ConfigCache::load(&mut session)?;
    for key in ConfigKey::ALL {
        if key.is_sensitive() {
            writeln!(out, "{key} = <redacted>")?;
        } else {
            writeln!(out, "{key} = {}", cache.get(key))?;
        }
    }
    Ok(())
}

pub fn etag(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let mut session = ctx.open()?;
    let current = revision::current(&mut session)?;
    writeln!(out, "{}", revision::etag(current))?;
    Ok(())
}

/// Change one value. Every change except a new secret bumps the revision.
pub fn set(ctx: &Context, name: &str, value: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let key: ConfigKey = name.parse()?;
    if key == ConfigKey::Revision {
        bail!("{key} is managed by the database session and cannot be set");
    }
    key.validate(value.as_bytes())?;

    let mode = if key == ConfigKey::AuthSecret {
        TxMode::Write
    } else {
        TxMode::ReadWrite
    };

    let mut session = ctx.open()?;
    session.work(mode, |s| -> Result<(), ConfigError> {
        match queries::update_config_value(s.connection(), key.name(), value)? {
            1 => Ok(()),
            0 => Err(ConfigError::Missing(key)),
            _ => Err(ConfigError::Duplicate(key)),
        }
    })?;
    let current = revision::current(&mut session)?;

    info!(key = %key, mode = %mode, "Config value updated");
    writeln!(out, "etag {}", revision::etag(current))?;
    Ok(())
}

pub fn issue_cookie(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let mut session = ctx.open()?;
    let cache = ConfigCache::load(&mut session)?;
    let auth = CookieAuthenticator::from_config(&cache);
    writeln!(out, "{}", auth.issue().header_line())?;
    Ok(())
}

pub fn logout_all(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let mut session = ctx.open()?;
    rotate_secret(&mut session)?;
    writeln!(out, "auth secret rotated; all cookies are invalid")?;
    Ok(())
}
