//! Process-level configuration, paths and logging for microblog-admin.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
