//! End-to-end checks against on-disk databases through the public API only.

use std::path::{Path, PathBuf};

use litebind::{
    named_params, params, Connection, ConnectionOptions, DbError, ErrorCode, JournalMode,
    OpenFlags, OpenMode, TransactionBehavior,
};

fn create_db(dir: &Path) -> PathBuf {
    let path = dir.join("scenario.sqlite");
    let conn = Connection::open(&path, OpenFlags::READ_WRITE | OpenFlags::CREATE)
        .expect("create database");
    conn.execute(
        "CREATE TABLE entries (
            id    INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            score REAL
        );",
    )
    .expect("create schema");
    conn.close().expect("close");
    path
}

#[test]
fn test_scenario_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = create_db(dir.path());

    let conn = Connection::open(&path, OpenFlags::default()).expect("reopen");
    let mut insert = conn
        .prepare("INSERT INTO entries (id, label, score) VALUES (?1, ?2, ?3)")
        .expect("prepare insert");
    insert
        .execute(params![1_i64, "first", 0.5_f64])
        .expect("insert first");
    insert
        .execute((2_i64, String::from("second"), None::<f64>))
        .expect("insert second");
    assert_eq!(conn.last_insert_rowid(), 2);

    let mut select = conn
        .prepare("SELECT id, label, score FROM entries ORDER BY id")
        .expect("prepare select");
    let rows: Vec<(i64, String, Option<f64>)> = select
        .query_map((), |row| row.decode())
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("collect");
    assert_eq!(
        rows,
        vec![
            (1, "first".to_string(), Some(0.5)),
            (2, "second".to_string(), None),
        ]
    );
}

#[test]
fn test_committed_data_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = create_db(dir.path());

    {
        let conn = Connection::open(&path, OpenFlags::default()).expect("open");
        let mut tx = conn
            .transaction_with(TransactionBehavior::Exclusive)
            .expect("begin");
        let mut insert = tx
            .prepare("INSERT INTO entries (id, label) VALUES (:id, :label)")
            .expect("prepare insert");
        insert
            .execute(named_params! { ":id" => 10_i64, ":label" => "kept" })
            .expect("insert");
        tx.commit().expect("commit");

        // Dropped without commit.
        let tx = conn.transaction().expect("begin");
        tx.execute("INSERT INTO entries (id, label) VALUES (11, 'dropped');")
            .expect("insert");
    }

    let conn = Connection::open(&path, OpenFlags::READ_ONLY).expect("open read-only");
    let labels: Vec<String> = conn
        .prepare("SELECT label FROM entries ORDER BY id")
        .expect("prepare")
        .query_map((), |row| Ok(row.get(0)))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("collect");
    assert_eq!(labels, ["kept"]);
}

#[test]
fn test_read_only_open_reports_engine_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = create_db(dir.path());

    let conn = Connection::open(&path, OpenFlags::READ_ONLY).expect("open read-only");
    let mut insert = conn
        .prepare("INSERT INTO entries (id, label) VALUES (1, 'x')")
        .expect("prepare");
    let err = insert.execute(()).expect_err("read-only write");
    assert!(matches!(err, DbError::Status { .. }));
    assert_eq!(err.code().map(ErrorCode::primary), Some(8));
    assert!(err.to_string().contains("readonly"));
}

#[test]
fn test_connection_moves_across_threads() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = create_db(dir.path());
    let options = ConnectionOptions {
        modes: vec![OpenMode::ReadWrite, OpenMode::FullMutex],
        busy_timeout_ms: Some(1_000),
        foreign_keys: Some(true),
        journal_mode: Some(JournalMode::Wal),
    };
    let conn = Connection::open_with(&path, &options).expect("open with options");

    let conn = std::thread::spawn(move || {
        conn.execute("INSERT INTO entries (id, label) VALUES (7, 'threaded');")
            .expect("insert on worker");
        conn
    })
    .join()
    .expect("worker thread");

    let label = conn
        .query_row("SELECT label FROM entries WHERE id = ?1", (7_i64,), |row| {
            Ok(row.get::<String>(0))
        })
        .expect("query");
    assert_eq!(label, "threaded");
}
