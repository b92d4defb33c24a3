//! microblog-admin: operator CLI and CGI gate for the admin database.

mod commands;
mod gate;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use admin_config_and_utils::{init_logging, Config, Paths};
use admin_database::SessionOptions;
use clap::{Parser, Subcommand};
use commands::Context;

/// microblog-admin command-line interface.
#[derive(Parser)]
#[command(name = "microblog-admin")]
#[command(about = "Manage the microblog admin database and auth cookies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config file value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.microblog-admin
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Database file. Defaults to <base-dir>/site.sqlite
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new database with a generated configuration
    Init,
    /// Print the site configuration, secrets redacted
    Show,
    /// Print the current weak ETag
    Etag,
    /// Change one configuration value
    Set {
        /// Config key, e.g. path_feed or authlimit
        key: String,
        /// New value
        value: String,
    },
    /// Print a Set-Cookie header with a fresh auth token
    IssueCookie,
    /// Rotate the auth secret, invalidating every issued cookie
    LogoutAll,
    /// Answer one CGI request from HTTPS and HTTP_COOKIE
    Gate,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    let log_path = paths.ensure_dirs().ok().map(|()| paths.log_file());
    init_logging(&log_level, log_path);

    let ctx = Context {
        database: cli.database.unwrap_or_else(|| config.database_path(&paths)),
        options: SessionOptions {
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        },
    };

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Init => commands::init(&ctx, &mut out)?,
        Commands::Show => commands::show(&ctx, &mut out)?,
        Commands::Etag => commands::etag(&ctx, &mut out)?,
        Commands::Set { key, value } => commands::set(&ctx, &key, &value, &mut out)?,
        Commands::IssueCookie => commands::issue_cookie(&ctx, &mut out)?,
        Commands::LogoutAll => commands::logout_all(&ctx, &mut out)?,
        Commands::Gate => {
            let env = gate::RequestEnv::from_env();
            let now = chrono::Utc::now().timestamp();
            let response = gate::handle(&env, &ctx, now)?;
            response.write_to(&mut out)?;
        }
    }

    Ok(())
}
