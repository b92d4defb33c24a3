//! SQLite session layer for the microblog admin backend.
//!
//! This crate provides:
//! - [`Session`]: one exclusively owned connection with nested, mode-checked
//!   work blocks
//! - The revision counter (`lastmod`) bumped on every committed read-write
//!   chain and exposed to clients as a weak ETag
//! - Schema migrations for the `config` key/value table
//! - Query helpers for that table
//!
//! # Work blocks
//!
//! ```ignore
//! let mut session = Session::connect(path, false)?;
//!
//! let mut outer = session.begin(TxMode::ReadWrite)?;
//! queries::update_config_value(outer.connection(), "path_feed", "/feed.xml")?;
//! {
//!     let inner = outer.begin(TxMode::Read)?; // reuses the write transaction
//!     inner.finish()?;
//! }
//! outer.finish()?; // bumps `lastmod`, then commits
//! ```
//!
//! A block dropped without `finish()` rolls back the whole chain, so `?`
//! propagation never leaves a transaction open.

mod error;
pub mod migrations;
pub mod queries;
pub mod revision;
mod session;

pub use error::{DatabaseError, DatabaseResult};
pub use migrations::run_migrations;
pub use queries::ConfigRow;
pub use session::{ChainMode, Session, SessionOptions, TxMode, WorkBlock};
