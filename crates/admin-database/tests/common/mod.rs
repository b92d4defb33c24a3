use admin_database::{migrations, queries, revision, Session, TxMode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Create a database file with the schema and a revision counter at `start`.
pub fn init_test_db(start: u32) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("site.sqlite");

    let mut session = Session::connect(&path, true).expect("create database");
    session
        .work(TxMode::Write, |s| {
            migrations::run_migrations(s.connection())?;
            queries::insert_config_value(
                s.connection(),
                revision::REVISION_KEY,
                &revision::format_hex(start),
            )
        })
        .expect("install schema");
    session.close().expect("close");

    (dir, path)
}

pub fn open(path: &Path) -> Session {
    Session::connect(path, false).expect("open database")
}

pub fn open_with_timeout(path: &Path, timeout: Duration) -> Session {
    let options = admin_database::SessionOptions {
        busy_timeout: timeout,
    };
    Session::connect_with(path, false, &options).expect("open database")
}

pub fn revision_of(session: &mut Session) -> u32 {
    revision::current(session).expect("read revision")
}
