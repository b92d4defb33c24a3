//! Database error types.

use crate::TxMode;
use thiserror::Error;

/// Database error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `connect` was asked to create a database that already exists
    #[error("Database already exists: {0}")]
    AlreadyExists(String),

    /// `connect` was asked to open a database that does not exist
    #[error("Database not found: {0}")]
    NotFound(String),

    /// A write block was requested inside a read-only transaction
    #[error("Mode conflict: cannot open a {requested} work block inside a read-only transaction")]
    ModeConflict { requested: TxMode },

    /// The transaction this work block belonged to was already rolled back
    #[error("Work block belongs to a transaction that was canceled")]
    ChainCanceled,

    /// The connection has been closed
    #[error("Connection closed")]
    Closed,

    /// The `lastmod` row is absent
    #[error("Revision counter is missing")]
    RevisionMissing,

    /// The `lastmod` row is not a valid 32-bit hex value
    #[error("Revision counter is malformed: {0:?}")]
    RevisionMalformed(String),

    /// Bumping the revision would leave the 32-bit range
    #[error("Revision counter overflow: {current:#x} + {step}")]
    RevisionOverflow { current: u32, step: u32 },

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias using DatabaseError.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
