//! # Observability
//!
//! Centralized logging setup for the microblog-admin workspace.
//!
//! Crates are **log producers** only: they use the standard `tracing` macros
//! and never decide where the output goes. The binary calls
//! [`init_with_config`] once at startup.
//!
//! ## Outputs
//!
//! - Structured JSONL appended to `~/.microblog-admin/logs/admin.jsonl`
//!   (feature `jsonl`, on by default). One line per event, flushed per line so
//!   concurrent CGI processes can share the file.
//! - Compact human-readable lines on stderr. Stdout is never written to,
//!   because the request gate uses it for the response.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

#[cfg(feature = "jsonl")]
mod file_sink;

use std::path::PathBuf;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter (e.g. "debug", "info,admin_database=trace").
    /// Overridden by `RUST_LOG` when set.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.microblog-admin/logs/admin.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default JSONL log location, if a home directory can be determined.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".microblog-admin")
            .join("logs")
            .join("admin.jsonl")
    })
}

/// Initialize logging with custom configuration.
///
/// Installing a global subscriber twice is not an error here: the second call
/// is ignored, which keeps tests that initialize logging independent.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "jsonl")]
    {
        file_sink::init_file_subscriber(&config);
    }

    #[cfg(not(feature = "jsonl"))]
    {
        init_stderr_only(&config);
    }
}

/// Stderr-only subscriber, used when no log file can be opened.
pub(crate) fn init_stderr_only(config: &LogConfig) {
    use tracing_subscriber::util::SubscriberInitExt;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.default_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .try_init();
}

pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}
