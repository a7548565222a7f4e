//! Embedded task store
//!
//! One SQLite file holds two key-value spaces:
//!
//! ```text
//! active(id TEXT PRIMARY KEY, record TEXT)            # open tasks
//! archive(month TEXT, id TEXT, record TEXT)           # completed tasks
//!   PRIMARY KEY (month, id), month = "YYYY-MM"
//! ```
//!
//! Records are JSON documents (see [`crate::model::TaskRecord`]). All access
//! goes through [`Store::read`] or [`Store::write`]; a write holds an
//! `IMMEDIATE` transaction so concurrent writers queue on the busy timeout.

mod active;
mod archive;

pub use active::ActiveStore;
pub use archive::ArchiveStore;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{Error, Result};

/// Default time a writer waits for another process's lock.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

pub(crate) const ACTIVE_TABLE: &str = "active";
pub(crate) const ARCHIVE_TABLE: &str = "archive";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS active (\
       id TEXT PRIMARY KEY,\
       record TEXT NOT NULL\
     );\
     CREATE TABLE IF NOT EXISTS archive (\
       month TEXT NOT NULL,\
       id TEXT NOT NULL,\
       record TEXT NOT NULL,\
       PRIMARY KEY (month, id)\
     );";

/// Handle to the task database.
#[derive(Debug)]
pub struct Store {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>, busy_timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|err| {
            Error::StoreUnavailable(format!("cannot open {}: {err}", path.display()))
        })?;
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;",
        )?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), busy_timeout_ms, "opened task store");
        Ok(Self {
            conn: Some(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store with the full schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Some(conn),
            path: None,
        })
    }

    /// Wrap an existing connection as-is. No tables are created.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Some(conn),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the underlying connection. Later operations fail with
    /// [`Error::StoreUnavailable`]. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| Error::Storage(err)),
            None => Ok(()),
        }
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::StoreUnavailable("store is closed".to_string()))
    }

    /// Run `f` inside a read transaction.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.transaction(TransactionBehavior::Deferred, f)
    }

    /// Run `f` inside a write transaction. Any error rolls back everything
    /// `f` did.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.transaction(TransactionBehavior::Immediate, f)
    }

    fn transaction<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(conn, behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn require_table(conn: &Connection, table: &str) -> Result<()> {
    if table_exists(conn, table)? {
        Ok(())
    } else {
        Err(Error::StoreUnavailable(format!(
            "{table} task space is missing"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tasks.db");
        let store = Store::open(&path, DEFAULT_BUSY_TIMEOUT_MS).expect("open");
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
        let tables = store
            .read(|conn| {
                Ok((
                    table_exists(conn, ACTIVE_TABLE)?,
                    table_exists(conn, ARCHIVE_TABLE)?,
                ))
            })
            .expect("read");
        assert_eq!(tables, (true, true));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.db");
        {
            let store = Store::open(&path, DEFAULT_BUSY_TIMEOUT_MS).expect("open");
            store
                .write(|conn| {
                    conn.execute(
                        "INSERT INTO active (id, record) VALUES ('keep0000', '{}')",
                        [],
                    )?;
                    Ok(())
                })
                .expect("write");
        }
        let store = Store::open(&path, DEFAULT_BUSY_TIMEOUT_MS).expect("reopen");
        let count: i64 = store
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM active", [], |row| row.get(0))?))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn failed_write_rolls_back() {
        let store = Store::open_in_memory().expect("open");
        let result: Result<()> = store.write(|conn| {
            conn.execute(
                "INSERT INTO active (id, record) VALUES ('gone0000', '{}')",
                [],
            )?;
            Err(Error::OperationFailed("abort".to_string()))
        });
        assert!(result.is_err());
        let count: i64 = store
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM active", [], |row| row.get(0))?))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn closed_store_is_unavailable() {
        let mut store = Store::open_in_memory().expect("open");
        store.close().expect("close");
        store.close().expect("second close");
        assert!(!store.is_open());
        let err = store.read(|_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[test]
    fn bare_connection_has_no_task_spaces() {
        let store = Store::from_connection(Connection::open_in_memory().expect("conn"));
        let err = store
            .read(|conn| require_table(conn, ACTIVE_TABLE))
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }
}
