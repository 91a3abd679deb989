use std::path::{Path, PathBuf};

use rusqlite::Connection;
use sqlite_browser::db::{describe, fetch_rows, ROW_LIMIT};
use sqlite_browser::filter::MatchState;
use sqlite_browser::{
    CellValue, Controller, ControllerState, FieldValues, FormOutcome, Notification, Severity,
};
use tempfile::TempDir;

fn users_database(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("users.db");
    let conn = Connection::open(&path).expect("create database");
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO users (id, name) VALUES (1, 'Ann'), (2, 'Bob');",
    )
    .expect("seed users");
    path
}

fn table_contents(path: &Path) -> Vec<(i64, String)> {
    let conn = Connection::open(path).expect("reopen database");
    let mut stmt = conn
        .prepare("SELECT id, name FROM users ORDER BY id")
        .expect("prepare");
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("collect")
}

#[test]
fn browse_search_insert_and_delete_users() {
    let dir = TempDir::new().expect("temp dir");
    let path = users_database(&dir);
    let mut notes: Vec<Notification> = Vec::new();
    let mut controller = Controller::new();

    assert!(controller.open_database(&path, &mut notes));
    assert_eq!(controller.state(), ControllerState::ConnectionReady);
    assert_eq!(controller.tables(), ["users".to_string()]);
    assert_eq!(controller.active_table(), Some("users"));
    assert_eq!(controller.rows().len(), 2);

    let classification = controller.set_search("an");
    assert_eq!(classification.get(0), Some(MatchState::Match));
    assert_eq!(classification.get(1), Some(MatchState::NoMatch));

    let add = controller.begin_add(&mut notes).expect("add request");
    let fields: FieldValues = [("name", "Cara")].into_iter().collect();
    assert!(controller.finish_add(add, FormOutcome::Submitted(fields), &mut notes));
    assert_eq!(controller.rows().len(), 3);

    let bob = controller
        .rows()
        .rows
        .iter()
        .position(|row| row.values[1] == CellValue::Text("Bob".into()))
        .expect("Bob is loaded");
    let delete = controller.begin_delete(Some(bob), &mut notes).expect("delete request");
    assert!(controller.finish_delete(delete, true, &mut notes));

    assert_eq!(
        table_contents(&path),
        vec![(1, "Ann".to_string()), (3, "Cara".to_string())]
    );
    assert!(notes.iter().all(|note| note.severity != Severity::Error));
    assert!(notes.iter().any(|note| note.message == "Row deleted."));
}

#[test]
fn cancelled_forms_and_declined_deletes_leave_data_alone() {
    let dir = TempDir::new().expect("temp dir");
    let path = users_database(&dir);
    let mut notes: Vec<Notification> = Vec::new();
    let mut controller = Controller::new();
    assert!(controller.open_database(&path, &mut notes));

    let edit = controller.begin_edit(Some(0), &mut notes).expect("edit request");
    assert!(!controller.finish_edit(edit, FormOutcome::Cancelled, &mut notes));
    let delete = controller.begin_delete(Some(0), &mut notes).expect("delete request");
    assert!(!controller.finish_delete(delete, false, &mut notes));

    assert_eq!(
        table_contents(&path),
        vec![(1, "Ann".to_string()), (2, "Bob".to_string())]
    );
}

#[test]
fn repeated_fetches_match_and_respect_the_cap() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("big.db");
    let conn = Connection::open(&path).expect("create database");
    conn.execute_batch(
        "CREATE TABLE numbers (n INTEGER);
         WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 750)
         INSERT INTO numbers (n) SELECT n FROM seq;",
    )
    .expect("seed numbers");

    let schema = describe(&conn, "numbers").expect("describe");
    let first = fetch_rows(&conn, &schema).expect("first fetch");
    let second = fetch_rows(&conn, &schema).expect("second fetch");

    assert_eq!(first, second);
    assert_eq!(first.len(), ROW_LIMIT);
    assert!(first.truncated);
}

#[test]
fn failed_open_keeps_the_previous_database() {
    let dir = TempDir::new().expect("temp dir");
    let path = users_database(&dir);
    let junk = dir.path().join("junk.db");
    std::fs::write(&junk, b"definitely not a database file").expect("write junk");

    let mut notes: Vec<Notification> = Vec::new();
    let mut controller = Controller::new();
    assert!(controller.open_database(&path, &mut notes));
    assert!(!controller.open_database(&junk, &mut notes));

    assert_eq!(controller.database_path(), Some(path.as_path()));
    assert_eq!(controller.rows().len(), 2);
    let last = notes.last().expect("failure was reported");
    assert_eq!(last.severity, Severity::Error);
}
