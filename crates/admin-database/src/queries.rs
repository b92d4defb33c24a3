//! Query helpers for the `config` key/value table.
//!
//! All helpers take a `&Connection` borrowed from an open work block
//! (`Session::connection`). Values may be stored as TEXT or BLOB; they are
//! handed out as raw bytes and decoded by the caller.

use crate::{DatabaseError, DatabaseResult};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};

/// One raw row of the config table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub key: String,
    /// `None` for SQL NULL.
    pub value: Option<Vec<u8>>,
}

fn value_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
        ValueRef::Text(t) => Some(t.to_vec()),
        ValueRef::Blob(b) => Some(b.to_vec()),
    }
}

/// Every row of the config table, in storage order.
pub fn list_config_rows(conn: &Connection) -> DatabaseResult<Vec<ConfigRow>> {
    let mut stmt = conn.prepare("SELECT key, value FROM config")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ConfigRow {
                key: row.get(0)?,
                value: value_bytes(row.get_ref(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Value of a single key. Fails if the key is stored more than once.
pub fn get_config_value(conn: &Connection, key: &str) -> DatabaseResult<Option<Vec<u8>>> {
    let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;

    let mut values = stmt
        .query_map(params![key], |row| Ok(value_bytes(row.get_ref(0)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop().flatten()),
        n => Err(DatabaseError::InvalidData(format!(
            "config key {key:?} stored {n} times"
        ))),
    }
}

/// Overwrite the value of an existing key. Returns the number of rows changed.
pub fn update_config_value(conn: &Connection, key: &str, value: &str) -> DatabaseResult<usize> {
    let count = conn.execute(
        "UPDATE config SET value = ?1 WHERE key = ?2",
        params![value, key],
    )?;
    Ok(count)
}

/// Insert a new key.
pub fn insert_config_value(conn: &Connection, key: &str, value: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO config (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}
