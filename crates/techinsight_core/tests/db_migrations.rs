use techinsight_core::db::migrations::latest_version;
use techinsight_core::db::{open_db, open_db_in_memory, DbError};
use techinsight_core::{Paper, PaperCache, RawPaper};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "papers");
}

#[test]
fn file_database_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("techinsight.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("techinsight.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "papers");
}

#[test]
fn reopening_cache_keeps_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("techinsight.db");

    let cache = PaperCache::open(&path).unwrap();
    cache
        .upsert_many(&[paper("2401.00001"), paper("2401.00002")])
        .unwrap();
    drop(cache);

    let reopened = PaperCache::open(&path).unwrap();
    assert_eq!(reopened.count_papers().unwrap(), 2);
    assert!(reopened.get_paper("2401.00002").unwrap().is_some());
    assert_eq!(reopened.location(), Some(path.as_path()));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unopenable_path_is_reported_with_its_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("techinsight.db");

    let err = open_db(&path).unwrap_err();

    match &err {
        DbError::Open { location, .. } => assert_eq!(location, &path.display().to_string()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("techinsight.db"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn cache_open_failure_keeps_database_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("techinsight.db");

    let err = PaperCache::open(&path).err().unwrap();

    assert!(err.to_string().contains("cannot open paper cache at"));
}

fn paper(id: &str) -> Paper {
    Paper::from_raw(RawPaper {
        id: Some(format!("http://arxiv.org/abs/{id}")),
        title: Some(format!("Paper {id}")),
        authors: vec!["Ada Lovelace".to_string()],
        abstract_text: Some("Abstract.".to_string()),
        categories: vec!["cs.AI".to_string()],
        published_date: Some("2024-01-02T03:04:05Z".to_string()),
        pdf_link: Some(format!("http://arxiv.org/pdf/{id}")),
    })
    .unwrap()
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
