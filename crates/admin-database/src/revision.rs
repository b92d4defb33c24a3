//! The `lastmod` revision counter.
//!
//! A 32-bit value stored as lowercase hex under the `lastmod` config key and
//! served to clients as a weak ETag. It only moves forward, by a random step
//! in `1..=64`, so the number of writes cannot be read off its value.

use crate::{queries, DatabaseError, DatabaseResult, Session, TxMode};
use rand::Rng;
use rusqlite::Connection;

/// Config key holding the revision.
pub const REVISION_KEY: &str = "lastmod";

/// Largest initial value of a fresh database.
pub const INITIAL_MAX: u32 = 4096;

/// Largest step of a single bump.
pub const STEP_MAX: u32 = 64;

/// Random initial value in `1..=INITIAL_MAX`.
pub fn initial() -> u32 {
    rand::thread_rng().gen_range(1..=INITIAL_MAX)
}

/// Random step in `1..=STEP_MAX`.
pub fn step() -> u32 {
    1 + rand::thread_rng().gen_range(0..STEP_MAX)
}

/// Lowercase hex form used in storage and ETags.
pub fn format_hex(revision: u32) -> String {
    format!("{revision:x}")
}

/// Parse 1–8 hex digits (either case).
pub fn parse_hex(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 8 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(raw, 16).ok()
}

/// Weak ETag for a revision: `W/"<hex>"`.
pub fn etag(revision: u32) -> String {
    format!("W/\"{}\"", format_hex(revision))
}

/// `current + step`, refusing to leave the 32-bit range.
pub fn advance(current: u32, step: u32) -> DatabaseResult<u32> {
    current
        .checked_add(step)
        .ok_or(DatabaseError::RevisionOverflow { current, step })
}

/// Read the stored revision.
pub fn read(conn: &Connection) -> DatabaseResult<u32> {
    let raw = queries::get_config_value(conn, REVISION_KEY)?.ok_or(DatabaseError::RevisionMissing)?;
    let text = String::from_utf8_lossy(&raw);
    parse_hex(&text).ok_or_else(|| DatabaseError::RevisionMalformed(text.into_owned()))
}

/// Read-modify-write the revision by a random step. Must run inside the
/// write transaction whose commit it describes.
pub fn bump(conn: &Connection) -> DatabaseResult<u32> {
    let current = read(conn)?;
    let next = advance(current, step())?;

    let updated = queries::update_config_value(conn, REVISION_KEY, &format_hex(next))?;
    if updated != 1 {
        return Err(DatabaseError::InvalidData(format!(
            "expected one {REVISION_KEY} row, updated {updated}"
        )));
    }
    Ok(next)
}

/// Read the revision in its own read-only work block (or nested in the
/// caller's).
pub fn current(session: &mut Session) -> DatabaseResult<u32> {
    session.work(TxMode::Read, |s| read(s.connection()))
}
