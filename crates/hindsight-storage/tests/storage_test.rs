//! Store layout, migrations and raw query behaviour.

use rusqlite::Connection;

use hindsight_core::errors::StorageError;
use hindsight_core::traits::IVersionReader;
use hindsight_core::HindsightError;
use hindsight_storage::migrations::{self, LATEST_VERSION};
use hindsight_storage::queries::{entity_ops, version_ops};
use hindsight_storage::{from_sqlite_err, SqliteVersionReader, StorageEngine};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn raw_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    migrations::run_migrations(&conn).unwrap();
    conn
}

// ─── Migrations ──────────────────────────────────────────────────────────────

#[test]
fn fresh_database_migrates_to_latest() {
    let conn = Connection::open_in_memory().unwrap();
    assert_eq!(migrations::current_version(&conn).unwrap(), 0);

    let applied = migrations::run_migrations(&conn).unwrap();
    assert_eq!(applied, LATEST_VERSION);
    assert_eq!(migrations::current_version(&conn).unwrap(), LATEST_VERSION);
}

#[test]
fn migrations_are_idempotent() {
    let conn = raw_conn();
    assert_eq!(migrations::run_migrations(&conn).unwrap(), 0);
}

#[test]
fn versions_table_rejects_unknown_events() {
    let conn = raw_conn();
    let result = version_ops::insert_version(
        &conn,
        "Chapter",
        1,
        "touch",
        None,
        "2024-01-01T00:00:00.000000Z",
        None,
    );
    assert!(result.is_err());
}

#[test]
fn file_store_reopens_at_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hindsight.db");

    {
        let engine = StorageEngine::open(&path).unwrap();
        assert_eq!(engine.schema_version().unwrap(), LATEST_VERSION);
    }
    let engine = StorageEngine::open(&path).unwrap();
    assert_eq!(engine.schema_version().unwrap(), LATEST_VERSION);
    assert_eq!(engine.path(), Some(path.as_path()));
}

#[test]
fn in_memory_stores_are_isolated() {
    let a = StorageEngine::open_in_memory().unwrap();
    let b = StorageEngine::open_in_memory().unwrap();

    a.writer()
        .with_conn_sync(|conn| entity_ops::upsert_live(conn, "Chapter", 1, r#"{"id":1}"#))
        .unwrap();

    let in_a = a
        .readers()
        .with_conn(|conn| entity_ops::get_live(conn, "Chapter", 1))
        .unwrap();
    let in_b = b
        .readers()
        .with_conn(|conn| entity_ops::get_live(conn, "Chapter", 1))
        .unwrap();
    assert!(in_a.is_some());
    assert!(in_b.is_none());
}

// ─── Version queries ─────────────────────────────────────────────────────────

#[test]
fn versions_come_back_in_chronological_order() {
    let conn = raw_conn();
    let late = version_ops::insert_version(
        &conn, "Chapter", 1, "update", Some(r#"{"id":1}"#), "2024-01-03T00:00:00.000000Z", None,
    )
    .unwrap();
    let early = version_ops::insert_version(
        &conn, "Chapter", 1, "create", None, "2024-01-01T00:00:00.000000Z", None,
    )
    .unwrap();
    let tied = version_ops::insert_version(
        &conn, "Chapter", 1, "update", Some(r#"{"id":1}"#), "2024-01-03T00:00:00.000000Z", None,
    )
    .unwrap();

    let ids: Vec<u64> = version_ops::get_versions_for_item(&conn, "Chapter", 1)
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec![early, late, tied]);
    assert_eq!(version_ops::get_version_count(&conn, "Chapter", 1).unwrap(), 3);
}

#[test]
fn historical_reference_lookup_reads_payload_fields() {
    let conn = raw_conn();
    version_ops::insert_version(
        &conn,
        "Section",
        3,
        "update",
        Some(r#"{"id":3,"chapter_id":1,"name":"intro"}"#),
        "2024-01-02T00:00:00.000000Z",
        None,
    )
    .unwrap();
    version_ops::insert_version(
        &conn,
        "Section",
        4,
        "destroy",
        Some(r#"{"id":4,"chapter_id":2,"name":"outro"}"#),
        "2024-01-02T00:00:00.000000Z",
        None,
    )
    .unwrap();
    version_ops::insert_version(&conn, "Section", 5, "create", None, "2024-01-02T00:00:00.000000Z", None)
        .unwrap();

    let ids = version_ops::ids_with_historical_reference(&conn, "Section", "chapter_id", 1).unwrap();
    assert_eq!(ids, vec![3]);
    assert_eq!(version_ops::max_recorded_item_id(&conn, "Section").unwrap(), 5);
    assert_eq!(version_ops::max_recorded_item_id(&conn, "Paragraph").unwrap(), 0);
}

#[test]
fn missing_version_is_none() {
    let conn = raw_conn();
    assert!(version_ops::get_version(&conn, 42).unwrap().is_none());
}

// ─── Live rows ───────────────────────────────────────────────────────────────

#[test]
fn live_rows_upsert_and_delete() {
    let conn = raw_conn();
    entity_ops::upsert_live(&conn, "Section", 1, r#"{"id":1,"chapter_id":7}"#).unwrap();
    entity_ops::upsert_live(&conn, "Section", 2, r#"{"id":2,"chapter_id":7}"#).unwrap();
    entity_ops::upsert_live(&conn, "Section", 2, r#"{"id":2,"chapter_id":8}"#).unwrap();

    assert_eq!(
        entity_ops::live_ids_referencing(&conn, "Section", "chapter_id", 7).unwrap(),
        vec![1]
    );
    assert_eq!(entity_ops::count_live(&conn, "Section").unwrap(), 2);
    assert_eq!(entity_ops::max_live_item_id(&conn, "Section").unwrap(), 2);

    assert!(entity_ops::delete_live(&conn, "Section", 1).unwrap());
    assert!(!entity_ops::delete_live(&conn, "Section", 1).unwrap());
    assert!(entity_ops::get_live(&conn, "Section", 1).unwrap().is_none());
}

// ─── Reader ──────────────────────────────────────────────────────────────────

#[test]
fn reader_orders_mixed_precision_timestamps_by_instant() {
    let conn = raw_conn();
    let created =
        version_ops::insert_version(&conn, "Chapter", 1, "create", None, "2024-01-01T00:00:00Z", None)
            .unwrap();
    let half_past = version_ops::insert_version(
        &conn,
        "Chapter",
        1,
        "update",
        Some(r#"{"id":1,"name":"b"}"#),
        "2024-01-01T00:00:05.500000Z",
        None,
    )
    .unwrap();
    let on_the_second = version_ops::insert_version(
        &conn,
        "Chapter",
        1,
        "update",
        Some(r#"{"id":1,"name":"a"}"#),
        "2024-01-01T00:00:05Z",
        None,
    )
    .unwrap();

    let reader = SqliteVersionReader::new(&conn);
    let sequences: Vec<u64> = reader
        .versions_for("Chapter", 1)
        .unwrap()
        .iter()
        .map(|v| v.sequence)
        .collect();
    assert_eq!(sequences, vec![created, on_the_second, half_past]);
}

// ─── Error classification ────────────────────────────────────────────────────

fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
}

#[test]
fn contention_maps_to_store_unavailable() {
    for code in [
        rusqlite::ffi::SQLITE_BUSY,
        rusqlite::ffi::SQLITE_LOCKED,
        rusqlite::ffi::SQLITE_INTERRUPT,
        rusqlite::ffi::SQLITE_CANTOPEN,
    ] {
        assert!(from_sqlite_err(sqlite_failure(code)).is_store_unavailable());
    }
}

#[test]
fn other_sqlite_failures_stay_query_errors() {
    let err = from_sqlite_err(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
    assert!(!err.is_store_unavailable());
    assert!(matches!(
        err,
        HindsightError::StorageError(StorageError::SqliteError { .. })
    ));
}
