mod common;

use common::{fixture_with_policy, Fixture, TRACK_COUNT};
use kalamar_core::{
    AccessPoint, CorruptContentPolicy, HeaderCodec, MemoryStore, PropertySchema, RawRecord,
    RecordKey, Site, SiteError, StorageBackend,
};
use rusqlite::{params, Connection};
use std::sync::Arc;

fn inject_row(fx: &Fixture, access_point: &str, key: &str, metadata: &str, content: &[u8]) {
    let conn = Connection::open(fx.dir.path().join("music.sqlite3")).unwrap();
    conn.execute(
        "INSERT INTO records (access_point, record_key, metadata, content)
         VALUES (?1, ?2, ?3, ?4);",
        params![access_point, key, metadata, content],
    )
    .unwrap();
}

#[test]
fn skip_policy_drops_undecodable_payloads() {
    let fx = fixture_with_policy("skip");
    assert_eq!(fx.site.corrupt_content_policy(), CorruptContentPolicy::Skip);
    inject_row(&fx, "sqlite_json", "zz/broken", "{}", b"not json");

    let mut results = fx.site.search("sqlite_json", "").unwrap();
    let items: Vec<_> = results.by_ref().map(|item| item.unwrap()).collect();
    assert_eq!(items.len(), TRACK_COUNT);
    assert_eq!(results.skipped(), 1);

    let nuages = fx.site.open("sqlite_json", "titre=nuages").unwrap();
    assert_eq!(nuages.text("piste").as_deref(), Some("3"));
}

#[test]
fn skip_policy_drops_mistyped_metadata() {
    let fx = fixture_with_policy("skip");
    inject_row(
        &fx,
        "sqlite_plain",
        "rock/x/y/z/four",
        r#"{"genre":"rock","artiste":"x","album":"y","titre":"z","piste":"four"}"#,
        b"",
    );

    assert_eq!(fx.site.count("sqlite_plain", "rock").unwrap(), 14);
    assert_eq!(fx.site.count("sqlite_json", "").unwrap(), TRACK_COUNT);
}

#[test]
fn skip_policy_drops_rows_with_unreadable_metadata() {
    let fx = fixture_with_policy("skip");
    inject_row(&fx, "sqlite_plain", "rock/x/y/z/1", "not json", b"");

    let mut results = fx.site.search("sqlite_plain", "").unwrap();
    assert_eq!(results.by_ref().map(|item| item.unwrap()).count(), TRACK_COUNT);
    assert_eq!(results.skipped(), 1);

    assert_eq!(fx.site.count("sqlite_plain", "").unwrap(), TRACK_COUNT);
    let sob = fx.site.open("sqlite_plain", "titre=sob").unwrap();
    assert_eq!(sob.text("album").as_deref(), Some("S.O.B"));
}

#[test]
fn fail_policy_reports_rows_with_unreadable_metadata() {
    let fx = fixture_with_policy("fail");
    inject_row(&fx, "sqlite_plain", "rock/x/y/z/1", "not json", b"");

    match fx.site.count("sqlite_plain", "").unwrap_err() {
        SiteError::CorruptContent {
            access_point, key, ..
        } => {
            assert_eq!(access_point, "sqlite_plain");
            assert_eq!(key.as_str(), "rock/x/y/z/1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn fail_policy_surfaces_corrupt_content() {
    let fx = fixture_with_policy("fail");
    inject_row(&fx, "sqlite_json", "zz/broken", "{}", b"not json");

    let err = fx.site.count("sqlite_json", "").unwrap_err();
    match err {
        SiteError::CorruptContent {
            access_point, key, ..
        } => {
            assert_eq!(access_point, "sqlite_json");
            assert_eq!(key.as_str(), "zz/broken");
        }
        other => panic!("unexpected error: {other}"),
    }

    let results: Vec<_> = fx.site.search("sqlite_json", "").unwrap().collect();
    assert_eq!(results.len(), TRACK_COUNT + 1);
    assert_eq!(results.iter().filter(|item| item.is_err()).count(), 1);
    assert_eq!(fx.site.count("sqlite_plain", "").unwrap(), TRACK_COUNT);
}

#[test]
fn policies_apply_to_any_backend() {
    let store = Arc::new(MemoryStore::new());
    let schema = PropertySchema::from_specs(["genre", "titre", "_content:content"]).unwrap();
    store
        .write(&RawRecord {
            key: RecordKey::new("broken"),
            metadata: Default::default(),
            content: b"missing header terminator".to_vec(),
        })
        .unwrap();

    let build = |policy| {
        let mut site = Site::new().with_corrupt_content_policy(policy);
        let ap = AccessPoint::new("tapes", schema.clone(), Box::new(Arc::clone(&store)))
            .with_codec(Box::new(HeaderCodec));
        site.register(ap).unwrap();
        site
    };

    let lenient = build(CorruptContentPolicy::Skip);
    assert_eq!(lenient.count("tapes", "").unwrap(), 0);
    assert_eq!(lenient.open("tapes", "").unwrap_err().code(), "object_does_not_exist");

    let strict = build(CorruptContentPolicy::Fail);
    assert_eq!(strict.open("tapes", "").unwrap_err().code(), "corrupt_content");
}
