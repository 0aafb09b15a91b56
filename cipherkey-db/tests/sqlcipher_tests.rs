use cipherkey_core::{Directives, KeyingError};
use cipherkey_db::SqlCipherEngine;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::Path;

fn key_only(key: &str) -> Directives {
    Directives::new().with("key", key)
}

/// Creates an encrypted database at `path` with one 16 KiB blob row.
fn create_encrypted_db(path: &Path, key: &str) {
    let conn = Connection::open(path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only(key)).unwrap();
    let conn = engine.into_inner();
    conn.execute_batch("CREATE TABLE x(y BLOB); INSERT INTO x VALUES (randomblob(16384));")
        .unwrap();
}

fn open_keyed(path: &Path, key: &str) -> Connection {
    let conn = Connection::open(path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only(key)).unwrap();
    engine.into_inner()
}

// ── Empty-file population ────────────────────────────────────────

#[test]
fn empty_file_is_populated_and_encrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");

    let conn = Connection::open(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only("secret")).unwrap();
    drop(engine);

    // the write-back probe materialized at least one page
    assert!(fs::metadata(&path).unwrap().len() >= 512);

    // and the header is not the cleartext SQLite magic
    let prefix = &fs::read(&path).unwrap()[..15];
    assert_ne!(prefix, b"SQLite format 3");
}

// ── Round trips and idempotence ──────────────────────────────────

#[test]
fn keyed_database_round_trips_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "hello world");

    let conn = open_keyed(&path, "hello world");
    let len: i64 = conn
        .query_row("SELECT length(y) FROM x", [], |r| r.get(0))
        .unwrap();
    assert_eq!(len, 16384);
}

#[test]
fn reapplying_the_same_key_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "hello world");

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only("hello world")).unwrap();
    engine.apply(key_only("hello world")).unwrap();

    let conn = engine.into_inner();
    let rows: i64 = conn
        .query_row("SELECT count(*) FROM x", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

// ── Wrong keys and cleartext files ───────────────────────────────

#[test]
fn wrong_key_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "hello world");

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    let result = engine.apply(key_only("hello world2"));
    assert!(
        matches!(result, Err(KeyingError::WrongKeyOrFormat(_))),
        "got {result:?}"
    );
}

#[test]
fn keying_a_cleartext_database_reports_wrong_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE x(y); INSERT INTO x VALUES (1);")
            .unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    let result = engine.apply(key_only("secret"));
    assert!(
        matches!(result, Err(KeyingError::WrongKeyOrFormat(_))),
        "got {result:?}"
    );
}

// ── Read-only connections ────────────────────────────────────────

#[test]
fn read_only_connection_succeeds_without_touching_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "hello world");
    let before = fs::read(&path).unwrap();

    let conn =
        Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only("hello world")).unwrap();

    // correctly keyed: data is readable
    let rows: i64 = engine
        .connection()
        .query_row("SELECT count(*) FROM x", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn read_only_connection_still_detects_a_wrong_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "hello world");

    let conn =
        Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    let result = engine.apply(key_only("wrong"));
    assert!(matches!(result, Err(KeyingError::WrongKeyOrFormat(_))));
}

// ── Preconditions ────────────────────────────────────────────────

#[test]
fn open_transaction_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.connection().execute_batch("BEGIN").unwrap();

    let result = engine.apply(key_only("secret"));
    assert!(matches!(result, Err(KeyingError::AlreadyInTransaction)));

    engine.connection().execute_batch("ROLLBACK").unwrap();
}

// ── Rekeying ─────────────────────────────────────────────────────

#[test]
fn rekey_changes_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    create_encrypted_db(&path, "old key");

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    engine.apply(key_only("old key")).unwrap();
    engine
        .apply(Directives::new().with("rekey", "new key"))
        .unwrap();
    drop(engine);

    // old key no longer opens the file
    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    assert!(matches!(
        engine.apply(key_only("old key")),
        Err(KeyingError::WrongKeyOrFormat(_))
    ));
    drop(engine);

    // new key does
    let conn = open_keyed(&path, "new key");
    let rows: i64 = conn
        .query_row("SELECT count(*) FROM x", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

// ── Acknowledgment validation ────────────────────────────────────

#[test]
fn unrecognized_directive_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let conn = Connection::open(&path).unwrap();
    let mut engine = SqlCipherEngine::new(conn);
    // SQLite ignores unknown pragmas silently; the missing echo is
    // what surfaces the problem.
    let result = engine.apply(
        Directives::new()
            .with("key", "secret")
            .with("definitely_not_a_pragma", 7),
    );
    match result {
        Err(KeyingError::DirectiveRejected { name, expected, .. }) => {
            assert_eq!(name, "definitely_not_a_pragma");
            assert_eq!(expected, "7");
        }
        other => panic!("expected DirectiveRejected, got {other:?}"),
    }
}
