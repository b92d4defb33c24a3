//! Logging initialization.
//!
//! Thin wrapper over the `observability` package so every entry point sets up
//! tracing the same way.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize logging: JSONL to `log_path` (or the default location) plus
/// compact stderr output. `RUST_LOG` overrides `level`.
///
/// ```ignore
/// init_logging("info", None);
/// tracing::info!("started");
/// ```
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        default_level: level.into(),
        log_path,
        also_stderr: true,
    });
}
