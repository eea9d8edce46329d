//! Unit tests for the safe SQLite wrapper.

use std::ffi::CStr;

use test_case::test_case;

use super::*;
use crate::{named_params, params};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("litebind=trace")
        .with_test_writer()
        .try_init();
}

fn open_with_table() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute("CREATE TABLE t (a INTEGER, b TEXT);")
        .expect("create table");
    conn
}

/// Binds `value` as `?1` of `SELECT ?1` and reads it back as the same type.
fn round_trip<T>(value: T) -> T
where
    T: ToSql + for<'r> FromColumn<'r>,
{
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn.fetch("SELECT ?1", (value,)).expect("fetch");
    let row = rows.next().expect("step").expect("one row");
    row.get(0)
}

fn collect_a(stmt: &mut Statement<'_>) -> Vec<i64> {
    let mut rows = stmt.fetch();
    let mut out = Vec::new();
    while let Some(row) = rows.next().expect("step") {
        out.push(row.get(0));
    }
    out
}

// ── Connection ──────────────────────────────────────────────────────────

#[test]
fn test_insert_then_fetch_one_row() {
    init_tracing();
    let conn = open_with_table();
    let mut insert = conn
        .prepare("INSERT INTO t VALUES (?, ?)")
        .expect("prepare insert");
    insert.execute((1, "x")).expect("insert");

    let mut rows = conn.fetch("SELECT a, b FROM t", ()).expect("fetch");
    let row = rows.next().expect("step").expect("one row");
    let (a, b): (i64, String) = row.decode().expect("decode");
    assert_eq!((a, b.as_str()), (1, "x"));
    assert!(rows.next().expect("step").is_none());
}

#[test]
fn test_query_row_optional_none() {
    let conn = open_with_table();
    let result = conn
        .query_row_optional("SELECT a FROM t WHERE a = 999", (), |row| {
            Ok(row.get::<i64>(0))
        })
        .expect("query");
    assert!(result.is_none());

    let err = conn
        .query_row("SELECT a FROM t WHERE a = 999", (), |row| Ok(row.get::<i64>(0)))
        .expect_err("no row");
    assert_eq!(err.code(), Some(ErrorCode(ffi::SQLITE_DONE)));
}

#[test]
fn test_execute_error_carries_engine_message() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn
        .execute("INSERT INTO nope VALUES (1);")
        .expect_err("missing table");
    match err {
        DbError::Execute { code, message } => {
            assert_eq!(code.primary(), ffi::SQLITE_ERROR);
            assert_eq!(message.as_deref(), Some("no such table: nope"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_execute_rejects_interior_nul() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn.execute("SELECT 1;\0").expect_err("nul byte");
    assert!(matches!(err, DbError::Nul(_)));
    assert!(err.code().is_none());
}

#[test]
fn test_prepare_errors() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn.prepare("SELEC 1").expect_err("syntax error");
    assert_eq!(err.code().map(ErrorCode::primary), Some(ffi::SQLITE_ERROR));

    let err = conn.prepare("   -- only a comment").expect_err("no statement");
    assert_eq!(err.code(), Some(ErrorCode(ffi::SQLITE_MISUSE)));
}

#[test]
fn test_extended_result_codes_are_enabled() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute("CREATE TABLE u (id INTEGER UNIQUE);")
        .expect("create table");
    let mut insert = conn
        .prepare("INSERT INTO u VALUES (?1)")
        .expect("prepare insert");
    insert.execute((1,)).expect("first insert");
    let err = insert.execute((1,)).expect_err("duplicate");
    // SQLITE_CONSTRAINT_UNIQUE
    assert_eq!(err.code(), Some(ErrorCode(2067)));
    assert_eq!(err.code().map(ErrorCode::primary), Some(19));

    // The failed step left the statement reusable.
    insert.execute((2,)).expect("insert after failure");
}

#[test]
fn test_changes_and_last_insert_rowid() {
    let conn = open_with_table();
    conn.execute("INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c');")
        .expect("insert");
    assert_eq!(conn.changes(), 3);
    assert_eq!(conn.last_insert_rowid(), 3);
    conn.execute("DELETE FROM t WHERE a > 1;").expect("delete");
    assert_eq!(conn.changes(), 2);
}

#[test]
fn test_engine_pass_throughs() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    assert_eq!(conn.is_database_readonly("main"), Some(false));
    assert_eq!(conn.is_database_readonly("not_attached"), None);
    conn.release_memory().expect("release memory");
    conn.busy_timeout(std::time::Duration::from_millis(100))
        .expect("busy timeout");
    conn.close().expect("close");
}

#[test]
fn test_connection_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Connection>();
}

// ── Files and flags ─────────────────────────────────────────────────────

#[test]
fn test_read_only_connection_rejects_writes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("ro.sqlite");

    {
        let conn = Connection::open(&path, OpenFlags::READ_WRITE | OpenFlags::CREATE)
            .expect("create db");
        conn.execute("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1);")
            .expect("write");
    }

    let conn = Connection::open(&path, OpenFlags::READ_ONLY).expect("open read-only");
    assert_eq!(conn.is_database_readonly("main"), Some(true));
    let err = conn
        .execute("INSERT INTO t VALUES (2);")
        .expect_err("write to read-only db");
    // SQLITE_READONLY
    assert_eq!(err.code().map(ErrorCode::primary), Some(8));

    let count = conn
        .query_row("SELECT count(*) FROM t", (), |row| Ok(row.get::<i64>(0)))
        .expect("read");
    assert_eq!(count, 1);
}

#[test]
fn test_default_flags_do_not_create() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing.sqlite");
    let err = Connection::open(&path, OpenFlags::default()).expect_err("missing file");
    // SQLITE_CANTOPEN
    assert_eq!(err.code().map(ErrorCode::primary), Some(14));
    assert!(!path.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_path_opens_that_exact_file() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(OsStr::from_bytes(b"db\xff.sqlite"));
    let conn = Connection::open(&path, OpenFlags::READ_WRITE | OpenFlags::CREATE)
        .expect("create db");
    conn.execute("CREATE TABLE t (a INTEGER);").expect("create table");
    conn.close().expect("close");

    assert!(path.exists());
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().as_bytes().to_vec())
        .collect();
    assert_eq!(names, [b"db\xff.sqlite".to_vec()]);
}

#[test]
fn test_open_with_options() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("opts.sqlite");
    let options: ConnectionOptions = serde_json::from_str(
        r#"{ "modes": ["read_write", "create"], "busy_timeout_ms": 50,
             "foreign_keys": true, "journal_mode": "wal" }"#,
    )
    .expect("decode options");

    let conn = Connection::open_with(&path, &options).expect("open with options");
    let mode = conn
        .query_row("PRAGMA journal_mode;", (), |row| Ok(row.get::<String>(0)))
        .expect("journal mode");
    assert_eq!(mode, "wal");
    let fk = conn
        .query_row("PRAGMA foreign_keys;", (), |row| Ok(row.get::<bool>(0)))
        .expect("foreign keys");
    assert!(fk);
}

// ── Binding ─────────────────────────────────────────────────────────────

#[test]
fn test_named_parameters_skip_unknown_names() {
    let conn = open_with_table();
    let mut insert = conn
        .prepare("INSERT INTO t (a, b) VALUES (:a, :b)")
        .expect("prepare insert");
    assert_eq!(insert.parameter_count(), 2);
    assert_eq!(insert.parameter_index(":b"), Some(2));
    assert_eq!(insert.parameter_index(":missing"), None);

    insert
        .execute(named_params! { ":a" => 5, ":missing" => "ignored" })
        .expect("insert with unknown name");

    let (a, b): (i64, Option<String>) = conn
        .query_row("SELECT a, b FROM t", (), |row| row.decode())
        .expect("query");
    assert_eq!(a, 5);
    assert_eq!(b, None);
}

#[test]
fn test_bind_named_reports_resolution() {
    let conn = open_with_table();
    let mut stmt = conn
        .prepare("SELECT @x + 1")
        .expect("prepare");
    assert!(stmt.bind_named("@x", &41).expect("bind"));
    assert!(!stmt.bind_named("@y", &1).expect("bind"));
    let mut rows = stmt.fetch();
    let row = rows.next().expect("step").expect("row");
    assert_eq!(row.get::<i32>(0), 42);
}

#[test]
fn test_positional_slice_and_clear_bindings() {
    let conn = open_with_table();
    let mut insert = conn
        .prepare("INSERT INTO t VALUES (?1, ?2)")
        .expect("prepare insert");
    insert.bind(params![7, "seven"]).expect("bind");
    insert.clear_bindings().expect("clear");
    insert.execute(()).expect("insert nulls");

    let nulls = conn
        .query_row("SELECT count(*) FROM t WHERE a IS NULL AND b IS NULL", (), |row| {
            Ok(row.get::<i64>(0))
        })
        .expect("query");
    assert_eq!(nulls, 1);
}

#[test_case(i64::MAX ; "i64 max")]
#[test_case(i64::MIN ; "i64 min")]
#[test_case(1 << 40 ; "beyond 32 bits")]
fn test_i64_keeps_full_precision(value: i64) {
    assert_eq!(round_trip(value), value);
}

#[test_case(i32::MAX ; "i32 max")]
#[test_case(i32::MIN ; "i32 min")]
#[test_case(-1 ; "minus one")]
fn test_i32_round_trip(value: i32) {
    assert_eq!(round_trip(value), value);
}

#[test]
fn test_narrow_and_float_round_trips() {
    assert_eq!(round_trip(i8::MIN), i8::MIN);
    assert_eq!(round_trip(i16::MAX), i16::MAX);
    assert_eq!(round_trip(u16::MAX), u16::MAX);
    assert_eq!(round_trip(u8::MAX), u8::MAX);
    assert!(round_trip(true));
    assert!((round_trip(1.5_f64) - 1.5).abs() < f64::EPSILON);
    assert!((round_trip(-0.25_f32) + 0.25).abs() < f32::EPSILON);
    assert_eq!(round_trip(String::from("héllo")), "héllo");
}

#[test]
fn test_null_reads_as_no_value() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn.fetch("SELECT ?1", (Null,)).expect("fetch");
    let row = rows.next().expect("step").expect("row");
    assert!(row.is_null(0));
    assert_eq!(row.get::<i64>(0), 0);
    assert_eq!(row.get::<i32>(0), 0);
    assert!(row.get::<f64>(0).abs() < f64::EPSILON);
    assert_eq!(row.get::<String>(0), "");
    assert_eq!(row.get::<&CStr>(0), c"");
    assert!(row.get::<Blob<'_>>(0).is_empty());
    assert_eq!(row.get::<Option<i64>>(0), None);
    assert_eq!(row.get::<Option<String>>(0), None);
}

#[test]
fn test_wide_text_round_trip() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let fixed: [u16; 3] = [0x0068, 0x00e9, 0x2603]; // "hé☃"
    let owned: Vec<u16> = "wide".encode_utf16().collect();
    let mut rows = conn
        .fetch("SELECT ?1, ?2, ?3", (fixed, owned.as_slice(), c"narrow"))
        .expect("fetch");
    let row = rows.next().expect("step").expect("row");
    assert_eq!(row.get::<String>(0), "hé☃");
    assert_eq!(row.get::<Vec<u16>>(0), fixed.to_vec());
    assert_eq!(row.get::<Vec<u16>>(1), owned);
    assert_eq!(row.get::<&str>(2), "narrow");
}

#[test]
fn test_borrowed_text_outlives_utf16_read() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn.fetch("SELECT 'abc'", ()).expect("fetch");
    let row = rows.next().expect("step").expect("row");
    let narrow: &CStr = row.get(0);
    let wide: Vec<u16> = row.get(0);
    assert_eq!(narrow, c"abc");
    assert_eq!(String::from_utf16(&wide).expect("utf-16"), "abc");
}

#[test]
fn test_zero_length_text_and_blob() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn
        .fetch("SELECT '', zeroblob(0), x'DEADBEEF'", ())
        .expect("fetch");
    let row = rows.next().expect("step").expect("row");
    assert_eq!(row.get::<String>(0), "");
    assert_eq!(row.get::<Option<String>>(0), Some(String::new()));
    assert!(row.get::<Blob<'_>>(1).is_empty());
    let blob: Blob<'_> = row.get(2);
    assert_eq!(blob.len(), 4);
    assert_eq!(blob.data(), &[0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test_case(126 ; "short")]
#[test_case(4_094 ; "page sized")]
#[test_case(65_534 ; "large")]
fn test_blob_survives_text_reads_of_same_column(len: usize) {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let expected = vec![b'A'; len];
    let mut rows = conn
        .fetch(
            "SELECT CAST(replace(hex(zeroblob(?1)), '00', 'A') AS BLOB)",
            (i64::try_from(len).expect("length fits"),),
        )
        .expect("fetch");
    let row = rows.next().expect("step").expect("row");

    let blob: Blob<'_> = row.get(0);
    let text: &str = row.get(0);
    let owned: String = row.get(0);
    let wide: Vec<u16> = row.get(0);
    let narrow: &CStr = row.get(0);
    // Give a freed buffer the chance to be reused.
    let churn: Vec<Vec<u8>> = (0..64).map(|i| vec![b'Z'; len + i]).collect();

    assert_eq!(blob.data(), expected.as_slice());
    assert_eq!(text.as_bytes(), expected.as_slice());
    assert_eq!(owned.len(), len);
    assert_eq!(wide.len(), len);
    assert_eq!(narrow, c"");
    assert_eq!(churn.len(), 64);
}

#[test]
fn test_blob_read_as_text() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn.fetch("SELECT x'41420043'", ()).expect("fetch");
    let row = rows.next().expect("step").expect("row");
    let blob: Blob<'_> = row.get(0);
    assert_eq!(row.get::<&CStr>(0), c"AB");
    assert_eq!(row.get::<&str>(0), "AB\0C");
    assert_eq!(row.get::<String>(0), "AB\0C");
    assert_eq!(blob.data(), b"AB\0C");
}

#[test]
fn test_unpaired_surrogate_binds_as_replacement() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let lone: [u16; 2] = [0x0061, 0xd800];
    let mut rows = conn.fetch("SELECT ?1", (lone,)).expect("fetch");
    let row = rows.next().expect("step").expect("row");
    assert_eq!(row.get::<String>(0), "a\u{fffd}");
}

// ── Rows ────────────────────────────────────────────────────────────────

#[test]
fn test_fetch_twice_yields_same_rows() {
    let conn = open_with_table();
    conn.execute("INSERT INTO t (a) VALUES (3), (1), (2);")
        .expect("insert");
    let mut stmt = conn
        .prepare("SELECT a FROM t ORDER BY a")
        .expect("prepare");

    let first = collect_a(&mut stmt);
    let second = collect_a(&mut stmt);
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(first, second);

    // An abandoned pass does not leak into the next one.
    {
        let mut rows = stmt.fetch();
        let row = rows.next().expect("step").expect("row");
        assert_eq!(row.get::<i64>(0), 1);
    }
    assert_eq!(collect_a(&mut stmt), vec![1, 2, 3]);
}

#[test]
fn test_rows_stay_done() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn.fetch("SELECT 1", ()).expect("fetch");
    assert!(rows.next().expect("step").is_some());
    assert!(rows.next().expect("step").is_none());
    assert!(rows.next().expect("step").is_none());

    rows.reset().expect("reset");
    assert!(rows.next().expect("step").is_some());
}

#[test]
fn test_step_failure_is_raised() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut rows = conn
        .fetch("SELECT abs(-9223372036854775808)", ())
        .expect("fetch");
    let err = rows.next().expect_err("integer overflow");
    assert_eq!(err.code().map(ErrorCode::primary), Some(ffi::SQLITE_ERROR));
}

#[test]
fn test_query_map_collects() {
    let conn = open_with_table();
    conn.execute("INSERT INTO t VALUES (1, 'one'), (2, 'two');")
        .expect("insert");
    let mut stmt = conn
        .prepare("SELECT b FROM t WHERE a >= ?1 ORDER BY a")
        .expect("prepare");
    let names: Vec<String> = stmt
        .query_map((1,), |row| Ok(row.get(0)))
        .expect("query")
        .collect::<DbResult<_>>()
        .expect("collect");
    assert_eq!(names, ["one", "two"]);

    let names: Vec<String> = stmt
        .query_map((2,), |row| Ok(row.get(0)))
        .expect("query")
        .collect::<DbResult<_>>()
        .expect("collect");
    assert_eq!(names, ["two"]);
}

#[test]
fn test_column_metadata() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn
        .prepare("SELECT 1 AS one, 'x' AS two")
        .expect("prepare");
    assert_eq!(stmt.column_count(), 2);
    assert_eq!(stmt.column_name(1).as_deref(), Some("two"));
    assert_eq!(stmt.sql(), Some("SELECT 1 AS one, 'x' AS two"));

    let mut rows = stmt.fetch();
    let row = rows.next().expect("step").expect("row");
    assert_eq!(row.column_count(), 2);
    assert_eq!(row.column_name(0).as_deref(), Some("one"));
}

#[derive(Debug, PartialEq)]
struct Entry {
    id: i64,
    label: String,
}

impl<'row> FromRow<'row> for Entry {
    fn from_row(row: &Row<'row>) -> DbResult<Self> {
        Ok(Self {
            id: row.get(0),
            label: row.get(1),
        })
    }
}

#[test]
fn test_decode_into_struct() {
    let conn = open_with_table();
    conn.execute("INSERT INTO t VALUES (9, 'nine');")
        .expect("insert");
    let entry: Entry = conn
        .query_row("SELECT a, b FROM t", (), |row| row.decode())
        .expect("query");
    assert_eq!(
        entry,
        Entry {
            id: 9,
            label: "nine".to_string()
        }
    );
}

// ── Transactions ────────────────────────────────────────────────────────

#[test]
fn test_transaction_commit() {
    let conn = open_with_table();
    {
        let mut tx = conn.transaction().expect("begin tx");
        tx.execute("INSERT INTO t (a) VALUES (42);").expect("insert");
        tx.commit().expect("commit");
        assert!(!tx.is_active());
        // Idempotent once terminal.
        tx.commit().expect("second commit");
        tx.rollback().expect("rollback after commit");
    }
    let result = conn
        .query_row("SELECT a FROM t WHERE a = 42", (), |row| Ok(row.get::<i64>(0)))
        .expect("query");
    assert_eq!(result, 42);
}

#[test]
fn test_transaction_rollback_on_drop() {
    let conn = open_with_table();
    {
        let tx = conn.transaction().expect("begin tx");
        let mut insert = tx
            .prepare("INSERT INTO t (a) VALUES (?1)")
            .expect("prepare insert");
        insert.execute((99,)).expect("insert");
        // Drop without commit -> rollback
    }
    let result = conn
        .query_row_optional("SELECT a FROM t WHERE a = 99", (), |row| {
            Ok(row.get::<i64>(0))
        })
        .expect("query");
    assert!(result.is_none());
}

#[test]
fn test_explicit_rollback() {
    let conn = open_with_table();
    let mut tx = conn
        .transaction_with(TransactionBehavior::Immediate)
        .expect("begin tx");
    tx.execute("INSERT INTO t (a) VALUES (1);").expect("insert");
    tx.rollback().expect("rollback");
    assert!(!tx.is_active());
    drop(tx);

    let count = conn
        .query_row("SELECT count(*) FROM t", (), |row| Ok(row.get::<i64>(0)))
        .expect("count");
    assert_eq!(count, 0);
}

#[test]
fn test_failed_implicit_rollback_does_not_panic() {
    init_tracing();
    let conn = open_with_table();
    let mut tx = conn.transaction().expect("begin tx");
    // End the transaction behind the guard's back.
    conn.execute("COMMIT;").expect("commit directly");

    let err = tx.rollback().expect_err("nothing to roll back");
    assert_eq!(err.code().map(ErrorCode::primary), Some(ffi::SQLITE_ERROR));
    assert!(tx.is_active());
    drop(tx); // logs the failed rollback and returns normally
}
