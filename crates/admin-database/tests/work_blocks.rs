mod common;

use admin_database::{queries, revision, ChainMode, DatabaseError, TxMode};
use std::time::Duration;

#[test]
fn balanced_nesting_commits_once_at_the_outermost_finish() {
    let (_dir, path) = common::init_test_db(0x100);
    let mut writer = common::open(&path);
    let mut observer = common::open(&path);

    let mut outer = writer.begin(TxMode::ReadWrite).expect("begin outer");
    queries::insert_config_value(outer.connection(), "note", "draft").expect("insert");
    {
        let mut middle = outer.begin(TxMode::Write).expect("begin middle");
        let inner = middle.begin(TxMode::Read).expect("begin inner");
        assert_eq!(inner.depth(), 3);
        inner.finish().expect("finish inner");
        assert_eq!(middle.depth(), 2);
        middle.finish().expect("finish middle");
    }
    assert_eq!(outer.depth(), 1);

    // Nothing is visible to another connection until the outer finish.
    let seen = observer
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "note"))
        .expect("observe");
    assert!(seen.is_none());

    outer.finish().expect("finish outer");
    assert_eq!(writer.depth(), 0);
    assert_eq!(writer.chain_mode(), ChainMode::None);

    let seen = observer
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "note"))
        .expect("observe");
    assert_eq!(seen, Some(b"draft".to_vec()));
}

#[test]
fn write_blocks_inside_read_transactions_conflict() {
    let (_dir, path) = common::init_test_db(1);
    let mut session = common::open(&path);

    let mut outer = session.begin(TxMode::Read).expect("begin");
    assert!(matches!(
        outer.begin(TxMode::ReadWrite).map(|b| b.finish()),
        Err(DatabaseError::ModeConflict {
            requested: TxMode::ReadWrite
        })
    ));
    assert!(matches!(
        outer.begin(TxMode::Write).map(|b| b.finish()),
        Err(DatabaseError::ModeConflict {
            requested: TxMode::Write
        })
    ));
    outer.finish().expect("finish");
}

#[test]
fn read_blocks_inside_write_transactions_reuse_them() {
    let (_dir, path) = common::init_test_db(1);
    let mut session = common::open(&path);

    for outer_mode in [TxMode::ReadWrite, TxMode::Write] {
        let mut outer = session.begin(outer_mode).expect("begin");
        let inner = outer.begin(TxMode::Read).expect("nested read");
        assert_eq!(inner.chain_mode(), ChainMode::ReadWrite);
        inner.finish().expect("finish inner");
        outer.finish().expect("finish outer");
    }
}

#[test]
fn any_rw_block_bumps_the_revision_exactly_once() {
    let (_dir, path) = common::init_test_db(0x500);
    let mut session = common::open(&path);

    for rw_blocks in 1..=5 {
        let before = common::revision_of(&mut session);

        let mut outer = session.begin(TxMode::Write).expect("begin");
        for _ in 0..rw_blocks {
            let mut block = outer.begin(TxMode::ReadWrite).expect("rw");
            let inner = block.begin(TxMode::ReadWrite).expect("nested rw");
            inner.finish().expect("finish");
            block.finish().expect("finish");
        }
        outer.finish().expect("commit");

        let after = common::revision_of(&mut session);
        let delta = after - before;
        assert!(
            (1..=revision::STEP_MAX).contains(&delta),
            "revision moved by {delta} with {rw_blocks} RW blocks"
        );
    }
}

#[test]
fn read_and_write_only_chains_leave_the_revision_alone() {
    let (_dir, path) = common::init_test_db(0x42);
    let mut session = common::open(&path);

    session
        .work(TxMode::Write, |s| {
            queries::insert_config_value(s.connection(), "note", "x")?;
            s.work(TxMode::Read, |_| Ok::<_, DatabaseError>(()))
        })
        .expect("write chain");
    session
        .work(TxMode::Read, |_| Ok::<_, DatabaseError>(()))
        .expect("read chain");

    assert_eq!(common::revision_of(&mut session), 0x42);
}

#[test]
fn updates_inside_a_read_chain_are_refused() {
    let (_dir, path) = common::init_test_db(0x10);
    let mut session = common::open(&path);
    session
        .work(TxMode::Write, |s| {
            queries::insert_config_value(s.connection(), "path_feed", "/a")
        })
        .expect("seed row");

    let result = session.work(TxMode::Read, |s| {
        queries::update_config_value(s.connection(), "path_feed", "/b")
    });
    assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    assert_eq!(session.depth(), 0);

    // Nested read blocks inside the read chain are refused the same way.
    let mut outer = session.begin(TxMode::Read).expect("read chain");
    {
        let inner = outer.begin(TxMode::Read).expect("nested read");
        assert!(queries::update_config_value(inner.connection(), "path_feed", "/c").is_err());
        inner.finish().expect("inner finish");
    }
    outer.finish().expect("outer finish");

    drop(session);
    let mut session = common::open(&path);
    let feed = session
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "path_feed"))
        .expect("read back");
    assert_eq!(feed.as_deref(), Some(&b"/a"[..]));
    assert_eq!(common::revision_of(&mut session), 0x10);
}

#[test]
fn revision_is_strictly_increasing_across_commits() {
    let (_dir, path) = common::init_test_db(revision::initial());
    let mut session = common::open(&path);

    let mut last = common::revision_of(&mut session);
    for _ in 0..50 {
        session
            .work(TxMode::ReadWrite, |_| Ok::<_, DatabaseError>(()))
            .expect("rw chain");
        let now = common::revision_of(&mut session);
        assert!(now > last);
        last = now;
    }
}

#[test]
fn cancel_discards_partial_work() {
    let (_dir, path) = common::init_test_db(0x10);
    let mut session = common::open(&path);

    let mut outer = session.begin(TxMode::ReadWrite).expect("begin");
    queries::insert_config_value(outer.connection(), "note", "x").expect("insert");
    let inner = outer.begin(TxMode::ReadWrite).expect("nested");
    queries::update_config_value(inner.connection(), revision::REVISION_KEY, "ffff")
        .expect("update");
    inner.cancel();
    drop(outer);

    assert_eq!(session.depth(), 0);
    assert!(!session.saw_write());
    session.cancel();

    let note = session
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "note"))
        .expect("read");
    assert!(note.is_none());
    assert_eq!(common::revision_of(&mut session), 0x10);
}

#[test]
fn overflowing_revision_aborts_the_commit() {
    let (_dir, path) = common::init_test_db(u32::MAX);
    let mut session = common::open(&path);

    let result = session.work(TxMode::ReadWrite, |s| {
        queries::insert_config_value(s.connection(), "note", "x")
    });
    assert!(matches!(result, Err(DatabaseError::RevisionOverflow { .. })));
    assert_eq!(session.depth(), 0);

    let note = session
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "note"))
        .expect("read");
    assert!(note.is_none());
}

#[test]
fn writers_serialize_when_the_write_block_opens() {
    let (_dir, path) = common::init_test_db(1);
    let mut first = common::open(&path);
    let mut second = common::open_with_timeout(&path, Duration::from_millis(50));

    let block = first.begin(TxMode::Write).expect("first writer");

    // The second writer cannot even open its block while the lock is held.
    let contended = second.begin(TxMode::Write).map(|b| b.finish());
    assert!(matches!(contended, Err(DatabaseError::Sqlite(_))));
    assert_eq!(second.depth(), 0);

    // Readers are not blocked by the writer.
    assert_eq!(common::revision_of(&mut second), 1);

    block.finish().expect("release");
    second
        .work(TxMode::Write, |_| Ok::<_, DatabaseError>(()))
        .expect("second writer after release");
}

#[test]
fn dropping_a_session_mid_transaction_rolls_back() {
    let (_dir, path) = common::init_test_db(7);

    {
        let mut session = common::open(&path);
        let block = session.begin(TxMode::ReadWrite).expect("begin");
        queries::insert_config_value(block.connection(), "note", "x").expect("insert");
        std::mem::forget(block);
    }

    let mut session = common::open(&path);
    let note = session
        .work(TxMode::Read, |s| queries::get_config_value(s.connection(), "note"))
        .expect("read");
    assert!(note.is_none());
    assert_eq!(common::revision_of(&mut session), 7);
}
