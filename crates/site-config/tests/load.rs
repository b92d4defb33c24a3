use admin_database::{queries, revision, DatabaseError, Session, TxMode};
use site_config::{ConfigCache, ConfigError, ConfigKey, ConfigSeed, PathKey};
use std::path::PathBuf;
use tempfile::TempDir;

fn seeded_db(seed: &ConfigSeed) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("site.sqlite");
    let mut session = Session::connect(&path, true).expect("create");
    seed.install(&mut session).expect("install seed");
    session.close().expect("close");
    (dir, path)
}

#[test]
fn generated_seed_loads_back() {
    let seed = ConfigSeed::generate()
        .with(ConfigKey::AuthSuffix, "abc")
        .with(ConfigKey::AuthWindowMinutes, "30");
    let (_dir, path) = seeded_db(&seed);

    let mut session = Session::connect(&path, false).expect("open");
    let cache = ConfigCache::load(&mut session).expect("load");
    assert_eq!(session.depth(), 0);

    assert_eq!(cache.auth_suffix(), "abc");
    assert_eq!(cache.auth_window_minutes(), 30);
    assert_eq!(Some(cache.auth_secret()), seed.value(ConfigKey::AuthSecret));
    assert_eq!(cache.path(PathKey::Admin), "/admin");
    assert!(cache.password_hash().is_none());
    assert!((1..=revision::INITIAL_MAX).contains(&cache.revision()));
}

#[test]
fn cache_outlives_the_session() {
    let (_dir, path) = seeded_db(&ConfigSeed::generate());

    let mut session = Session::connect(&path, false).expect("open");
    let cache = ConfigCache::load(&mut session).expect("load");
    session.close().expect("close");

    assert!(!cache.auth_secret().is_empty());
    assert!(cache.etag().starts_with("W/\""));
}

#[test]
fn loading_inside_a_write_chain_reuses_it() {
    let (_dir, path) = seeded_db(&ConfigSeed::generate());
    let mut session = Session::connect(&path, false).expect("open");

    let mut block = session.begin(TxMode::ReadWrite).expect("begin");
    queries::update_config_value(block.connection(), "path_feed", "/rss").expect("update");
    let cache = ConfigCache::load(&mut block).expect("load inside chain");
    assert_eq!(cache.path(PathKey::Feed), "/rss");
    assert_eq!(block.depth(), 1);
    block.finish().expect("commit");

    let reloaded = ConfigCache::load(&mut session).expect("reload");
    assert!(reloaded.revision() > cache.revision());
}

#[test]
fn external_edit_with_bad_value_rejects_the_whole_configuration() {
    let (_dir, path) = seeded_db(&ConfigSeed::generate());
    let mut session = Session::connect(&path, false).expect("open");

    session
        .work(TxMode::Write, |s| {
            queries::update_config_value(s.connection(), "authlimit", "forever")
        })
        .expect("edit");

    assert!(matches!(
        ConfigCache::load(&mut session),
        Err(ConfigError::Malformed {
            key: ConfigKey::AuthWindowMinutes,
            ..
        })
    ));
}

#[test]
fn duplicated_and_missing_rows_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("legacy.sqlite");
    let mut session = Session::connect(&path, true).expect("create");

    // A legacy table without a uniqueness constraint.
    session
        .work(TxMode::Write, |s| {
            s.connection()
                .execute_batch("CREATE TABLE config (key TEXT NOT NULL, value);")
                .map_err(DatabaseError::from)
        })
        .expect("schema");

    assert!(matches!(
        ConfigCache::load(&mut session),
        Err(ConfigError::Missing(ConfigKey::Epoch))
    ));

    let seed = ConfigSeed::generate();
    session
        .work(TxMode::Write, |s| -> Result<(), DatabaseError> {
            for key in ConfigKey::ALL {
                let value = seed.value(key).unwrap_or_default();
                queries::insert_config_value(s.connection(), key.name(), value)?;
            }
            queries::insert_config_value(s.connection(), "authsuffix", "other")?;
            queries::insert_config_value(s.connection(), "comments", "off")
        })
        .expect("rows");

    assert!(matches!(
        ConfigCache::load(&mut session),
        Err(ConfigError::Duplicate(ConfigKey::AuthSuffix))
    ));
}

#[test]
fn blob_paths_are_decoded_as_utf8() {
    let (_dir, path) = seeded_db(&ConfigSeed::generate());
    let mut session = Session::connect(&path, false).expect("open");

    session
        .work(TxMode::Write, |s| {
            s.connection()
                .execute(
                    "UPDATE config SET value = CAST(?1 AS BLOB) WHERE key = 'path_search'",
                    ["/suche/über"],
                )
                .map_err(DatabaseError::from)
        })
        .expect("blob update");

    let cache = ConfigCache::load(&mut session).expect("load");
    assert_eq!(cache.path(PathKey::Search), "/suche/über");
}
