//! Nested, mode-aware transactions over a single SQLite connection.
//!
//! A [`Session`] owns its connection exclusively. Work blocks opened with
//! [`Session::begin`] nest: only the outermost block starts and ends the
//! underlying transaction, inner blocks just adjust the depth. The mode of the
//! outermost block decides the locking:
//!
//! | mode  | outer statement   | bumps `lastmod` on commit |
//! |-------|-------------------|---------------------------|
//! | `R`   | `BEGIN DEFERRED`  | no                        |
//! | `RW`  | `BEGIN IMMEDIATE` | yes                       |
//! | `W`   | `BEGIN IMMEDIATE` | no                        |
//!
//! Write blocks may not be opened inside a read-only transaction, and the
//! connection is put in SQLite's `query_only` mode for its duration. A read
//! block inside a write transaction simply reuses it. If any block in the
//! chain was `RW`, the revision counter is bumped once, right before the
//! final commit.

use crate::{revision, DatabaseError, DatabaseResult};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requested mode of a work block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Read-only.
    Read,
    /// Read-write; the committed chain bumps the revision counter.
    ReadWrite,
    /// Read-write without a revision bump (e.g. secret rotation).
    Write,
}

impl TxMode {
    /// Whether this mode needs the write lock.
    pub fn is_write(self) -> bool {
        matches!(self, TxMode::ReadWrite | TxMode::Write)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxMode::Read => "R",
            TxMode::ReadWrite => "RW",
            TxMode::Write => "W",
        }
    }
}

impl fmt::Display for TxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode of the transaction currently open on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// No transaction is open.
    None,
    /// A deferred, read-only transaction.
    ReadOnly,
    /// An immediate transaction holding the write lock.
    ReadWrite,
}

/// Connection tuning for [`Session::connect_with`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long `begin` of a write block waits for the write lock.
    pub busy_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// One request's exclusive handle on the database.
pub struct Session {
    conn: Option<Connection>,
    path: PathBuf,
    depth: u32,
    mode: ChainMode,
    saw_write: bool,
    /// Incremented for every outer transaction, so stale work blocks can
    /// tell that their chain is gone.
    chain: u64,
}

impl Session {
    /// Open a database file with default options.
    ///
    /// With `create_new` the file must not exist yet; without it, it must.
    pub fn connect(path: &Path, create_new: bool) -> DatabaseResult<Self> {
        Self::connect_with(path, create_new, &SessionOptions::default())
    }

    /// Open a database file with explicit options.
    ///
    /// The existence check is not atomic with the open. Deployments never
    /// create or remove the file while serving traffic.
    pub fn connect_with(
        path: &Path,
        create_new: bool,
        options: &SessionOptions,
    ) -> DatabaseResult<Self> {
        let exists = path.exists();
        if create_new && exists {
            return Err(DatabaseError::AlreadyExists(path.display().to_string()));
        }
        if !create_new && !exists {
            return Err(DatabaseError::NotFound(path.display().to_string()));
        }

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create_new {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        debug!(path = %path.display(), create_new, "Session connected");
        Ok(Self::from_connection(conn, path.to_path_buf()))
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn, PathBuf::from(":memory:")))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Self {
        Self {
            conn: Some(conn),
            path,
            depth: 0,
            mode: ChainMode::None,
            saw_write: false,
            chain: 0,
        }
    }

    /// Path this session was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current nesting depth (0 when no transaction is open).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Mode of the open transaction.
    pub fn chain_mode(&self) -> ChainMode {
        self.mode
    }

    /// Whether a `RW` block has been opened in the current transaction.
    pub fn saw_write(&self) -> bool {
        self.saw_write
    }

    /// Open a work block.
    ///
    /// The outermost block starts the transaction; this is the only place a
    /// session blocks, waiting for the write lock of `RW`/`W` blocks up to the
    /// busy timeout. Fails with [`DatabaseError::ModeConflict`] when a write
    /// block is requested inside a read-only transaction; the session is left
    /// unchanged in that case.
    pub fn begin(&mut self, mode: TxMode) -> DatabaseResult<WorkBlock<'_>> {
        self.enter(mode)?;
        let chain = self.chain;
        Ok(WorkBlock {
            session: self,
            chain,
            mode,
            done: false,
        })
    }

    /// Run `f` inside a work block: finish on `Ok`, roll back on `Err`.
    pub fn work<T, E, F>(&mut self, mode: TxMode, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let mut block = self.begin(mode)?;
        let value = f(&mut *block)?;
        block.finish()?;
        Ok(value)
    }

    /// Roll back the open transaction, if any, and reset the session.
    ///
    /// Rollback failures are logged and swallowed. Calling this with no open
    /// transaction does nothing.
    pub fn cancel(&mut self) {
        if self.depth == 0 {
            return;
        }

        if let Some(conn) = &self.conn {
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                warn!(error = %err, chain = self.chain, "Rollback failed");
            }
        }
        debug!(depth = self.depth, chain = self.chain, "Transaction canceled");
        self.reset();
    }

    /// The underlying connection, for queries inside a work block.
    ///
    /// # Panics
    ///
    /// Panics when no work block is open: statements outside a transaction
    /// would bypass the revision counter.
    pub fn connection(&self) -> &Connection {
        assert!(
            self.depth > 0,
            "Session::connection() used outside of a work block"
        );
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only released by close or drop"),
        }
    }

    /// Roll back anything pending and close the connection, reporting a
    /// failed close.
    pub fn close(mut self) -> DatabaseResult<()> {
        self.cancel();
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| DatabaseError::Sqlite(err)),
            None => Ok(()),
        }
    }

    fn raw(&self) -> DatabaseResult<&Connection> {
        self.conn.as_ref().ok_or(DatabaseError::Closed)
    }

    fn enter(&mut self, mode: TxMode) -> DatabaseResult<()> {
        if self.depth == 0 {
            let statement = if mode.is_write() {
                "BEGIN IMMEDIATE"
            } else {
                "BEGIN DEFERRED"
            };
            let conn = self.raw()?;
            if !mode.is_write() {
                // SQLite refuses writes on this connection until reset().
                conn.execute_batch("PRAGMA query_only = ON")?;
            }
            if let Err(err) = conn.execute_batch(statement) {
                if !mode.is_write() {
                    release_query_only(conn);
                }
                return Err(err.into());
            }

            self.chain += 1;
            self.depth = 1;
            self.mode = if mode.is_write() {
                ChainMode::ReadWrite
            } else {
                ChainMode::ReadOnly
            };
            self.saw_write = mode == TxMode::ReadWrite;
            debug!(mode = %mode, chain = self.chain, "Transaction started");
            return Ok(());
        }

        if self.mode == ChainMode::ReadOnly && mode.is_write() {
            return Err(DatabaseError::ModeConflict { requested: mode });
        }

        self.depth += 1;
        if mode == TxMode::ReadWrite {
            self.saw_write = true;
        }
        debug!(mode = %mode, depth = self.depth, "Work block nested");
        Ok(())
    }

    fn exit(&mut self) -> DatabaseResult<()> {
        assert!(self.depth > 0, "finish() called without a matching begin()");

        if self.depth > 1 {
            self.depth -= 1;
            return Ok(());
        }

        // The revision must be written inside the transaction it describes.
        let bumped = if self.saw_write {
            Some(revision::bump(self.raw()?)?)
        } else {
            None
        };
        self.raw()?.execute_batch("COMMIT")?;

        match bumped {
            Some(revision) => info!(
                revision = %revision::format_hex(revision),
                chain = self.chain,
                "Committed write transaction"
            ),
            None => debug!(chain = self.chain, "Transaction committed"),
        }
        self.reset();
        Ok(())
    }

    fn is_active_chain(&self, chain: u64) -> bool {
        self.depth > 0 && self.chain == chain
    }

    fn reset(&mut self) {
        if self.mode == ChainMode::ReadOnly {
            if let Some(conn) = &self.conn {
                release_query_only(conn);
            }
        }
        self.depth = 0;
        self.mode = ChainMode::None;
        self.saw_write = false;
    }
}

fn release_query_only(conn: &Connection) {
    if let Err(err) = conn.execute_batch("PRAGMA query_only = OFF") {
        warn!(error = %err, "Failed to leave query-only mode");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("depth", &self.depth)
            .field("mode", &self.mode)
            .field("saw_write", &self.saw_write)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.depth > 0 {
            warn!(depth = self.depth, "Session dropped inside a transaction, rolling back");
            self.cancel();
        }
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                warn!(error = %err, path = %self.path.display(), "Failed to close database");
            }
        }
    }
}

/// Guard for one open work block.
///
/// Dereferences to the [`Session`], so nested blocks are opened from the
/// guard. Dropping it without [`finish`](WorkBlock::finish) rolls back the
/// whole transaction.
#[must_use = "a work block rolls back its transaction unless finished"]
pub struct WorkBlock<'s> {
    session: &'s mut Session,
    chain: u64,
    mode: TxMode,
    done: bool,
}

impl WorkBlock<'_> {
    /// Mode this block was opened with.
    pub fn mode(&self) -> TxMode {
        self.mode
    }

    /// Close the block. Closing the outermost block commits, bumping the
    /// revision counter first when the chain saw a `RW` block.
    ///
    /// On error the transaction is rolled back.
    pub fn finish(mut self) -> DatabaseResult<()> {
        if !self.session.is_active_chain(self.chain) {
            self.done = true;
            return Err(DatabaseError::ChainCanceled);
        }
        self.session.exit()?;
        self.done = true;
        Ok(())
    }

    /// Roll back the whole transaction this block belongs to.
    pub fn cancel(mut self) {
        self.done = true;
        if self.session.is_active_chain(self.chain) {
            self.session.cancel();
        }
    }
}

impl Deref for WorkBlock<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for WorkBlock<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for WorkBlock<'_> {
    fn drop(&mut self) {
        if !self.done && self.session.is_active_chain(self.chain) {
            debug!(mode = %self.mode, "Work block dropped unfinished, rolling back");
            self.session.cancel();
        }
    }
}
