use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{BrowserError, Result};

/// The one open database plus the file it came from.
struct ActiveDatabase {
    path: PathBuf,
    conn: Connection,
}

/// Owns the single live connection. Components never keep their own handle:
/// they ask for [`ConnectionManager::current`] right before each call, so a
/// replaced or closed connection can never be used by accident.
#[derive(Default)]
pub struct ConnectionManager {
    active: Option<ActiveDatabase>,
    generation: u64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` and make it the active database.
    ///
    /// The new file is opened and verified before the previous connection is
    /// touched, so a failed open leaves the old one in place. Closing the old
    /// connection is best-effort; a failure there is logged and ignored.
    pub fn open(&mut self, path: &Path) -> Result<&Connection> {
        debug!(path = %path.display(), "opening database");
        let conn = open_existing(path)?;

        if let Some(previous) = self.active.take() {
            close_quietly(previous);
        }

        self.generation += 1;
        info!(
            path = %path.display(),
            generation = self.generation,
            "database connection established"
        );
        let active = self.active.insert(ActiveDatabase {
            path: path.to_path_buf(),
            conn,
        });
        Ok(&active.conn)
    }

    /// Borrow the live connection or fail when nothing is open.
    pub fn current(&self) -> Result<&Connection> {
        self.active
            .as_ref()
            .map(|active| &active.conn)
            .ok_or_else(|| BrowserError::connection("no database is open"))
    }

    /// Close the active connection, if any.
    pub fn close(&mut self) {
        if let Some(previous) = self.active.take() {
            close_quietly(previous);
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the open database file.
    pub fn path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.path.as_path())
    }

    /// Incremented on every successful open. Work prepared against one
    /// generation must not be applied to another.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fail unless `generation` still names the live connection.
    pub fn ensure_generation(&self, generation: u64) -> Result<&Connection> {
        let conn = self.current()?;
        if generation != self.generation {
            return Err(BrowserError::connection(
                "the database was replaced since this action started",
            ));
        }
        Ok(conn)
    }
}

/// Open an existing file read-write and make SQLite actually read it. Opening
/// is lazy in SQLite, so without the catalog read a non-database file would
/// only fail on the first real query.
fn open_existing(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(BrowserError::connection(format!(
            "database file {} does not exist",
            path.display()
        )));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|err| {
        BrowserError::connection(format!("failed to open {}", path.display())).with_source(err)
    })?;

    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|err| {
        BrowserError::connection(format!("{} is not a readable database", path.display()))
            .with_source(err)
    })?;

    Ok(conn)
}

fn close_quietly(previous: ActiveDatabase) {
    let ActiveDatabase { path, conn } = previous;
    if let Err((_conn, err)) = conn.close() {
        warn!(path = %path.display(), error = %err, "failed to close previous database");
    } else {
        debug!(path = %path.display(), "closed previous database");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::ConnectionManager;
    use crate::error::BrowserError;

    fn database_with(dir: &TempDir, name: &str, sql: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let conn = Connection::open(&path).expect("create database");
        conn.execute_batch(sql).expect("seed database");
        path
    }

    #[test]
    fn current_fails_before_any_open() {
        let manager = ConnectionManager::new();
        assert!(matches!(
            manager.current(),
            Err(BrowserError::Connection { .. })
        ));
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn open_replaces_previous_connection() {
        let dir = TempDir::new().expect("temp dir");
        let first = database_with(&dir, "a.db", "CREATE TABLE a (x);");
        let second = database_with(&dir, "b.db", "CREATE TABLE b (y);");

        let mut manager = ConnectionManager::new();
        manager.open(&first).expect("open first");
        manager.open(&second).expect("open second");

        assert_eq!(manager.path(), Some(second.as_path()));
        assert_eq!(manager.generation(), 2);
        let name: String = manager
            .current()
            .expect("live connection")
            .query_row("SELECT name FROM sqlite_master", [], |row| row.get(0))
            .expect("catalog read");
        assert_eq!(name, "b");
    }

    #[test]
    fn failed_open_keeps_previous_connection() {
        let dir = TempDir::new().expect("temp dir");
        let good = database_with(&dir, "good.db", "CREATE TABLE t (x);");
        let junk = dir.path().join("junk.db");
        fs::write(&junk, b"this is definitely not a sqlite file, just text padding")
            .expect("write junk");

        let mut manager = ConnectionManager::new();
        manager.open(&good).expect("open good");

        let err = manager.open(&junk).expect_err("junk must not open");
        assert!(matches!(err, BrowserError::Connection { .. }));
        assert_eq!(manager.path(), Some(good.as_path()));
        assert_eq!(manager.generation(), 1);
        assert!(manager.current().is_ok());
    }

    #[test]
    fn missing_file_is_not_created() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing.db");

        let mut manager = ConnectionManager::new();
        assert!(manager.open(&missing).is_err());
        assert!(!missing.exists());
        assert!(!manager.is_open());
    }

    #[test]
    fn stale_generation_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = database_with(&dir, "a.db", "CREATE TABLE a (x);");

        let mut manager = ConnectionManager::new();
        manager.open(&path).expect("open");
        let captured = manager.generation();
        manager.open(&path).expect("reopen");

        assert!(manager.ensure_generation(captured).is_err());
        assert!(manager.ensure_generation(manager.generation()).is_ok());

        manager.close();
        assert!(manager.ensure_generation(manager.generation()).is_err());
    }
}
