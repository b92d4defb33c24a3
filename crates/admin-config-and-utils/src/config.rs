//! Process configuration for the admin tooling.
//!
//! This is the deployment-side configuration (where the database lives, how
//! verbose logging is). Site settings stored inside the database are handled
//! by the `site-config` crate.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default time a write work block waits for the database write lock.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const ENV_LOG_LEVEL: &str = "MICROBLOG_ADMIN_LOG_LEVEL";
const ENV_DATABASE: &str = "MICROBLOG_ADMIN_DATABASE";
const ENV_BUSY_TIMEOUT_MS: &str = "MICROBLOG_ADMIN_BUSY_TIMEOUT_MS";

/// Main process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Database file; `None` means `Paths::database_file()`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from the config file (if any), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(non_empty) {
            self.log_level = level;
        }
        if let Some(path) = lookup(ENV_DATABASE).and_then(non_empty) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS).and_then(non_empty) {
            self.busy_timeout_ms = raw.parse().map_err(|_| {
                CoreError::Config(format!("{ENV_BUSY_TIMEOUT_MS} must be an integer, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    /// Resolve the database file location.
    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
