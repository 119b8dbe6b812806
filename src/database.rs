//! Opening SQLite connections through the adapter

use crate::error::Result;
use crate::vfs::file::UsageToken;
use crate::vfs::registry::retain_default;
use rusqlite::{Connection, OpenFlags};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tracing::debug;

/// Open flags for a database, read-only or read-write-create
pub fn open_flags(readonly: bool) -> OpenFlags {
    let access = if readonly {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };
    access | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// A connection that keeps the adapter registered while it lives
///
/// Dereferences to [`Connection`]. [`teardown`](crate::teardown) returns
/// `InUse` until every `Database` is dropped.
#[derive(Debug)]
pub struct Database {
    // Closed before the registration is released
    conn: Connection,
    _registration: UsageToken,
}

impl Database {
    /// Close the connection, surfacing any error SQLite reports
    pub fn close(self) -> Result<()> {
        let Database {
            conn,
            _registration,
        } = self;
        conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for Database {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Open the database at `path` with all file I/O routed through the adapter
///
/// Registers the adapter first if this is the first use in the process.
/// Read-write opens create the file when it does not exist yet.
///
/// # Example
///
/// ```rust,no_run
/// use hostvfs::open_database;
///
/// # fn main() -> hostvfs::Result<()> {
/// let conn = open_database("saves/slot1.db", false)?;
/// conn.execute_batch("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v BLOB)")?;
/// # Ok(())
/// # }
/// ```
pub fn open_database<P: AsRef<Path>>(path: P, readonly: bool) -> Result<Database> {
    let (vfs, registration) = retain_default()?;
    let path = path.as_ref();
    debug!(
        "Opening {} via VFS '{}' (readonly: {})",
        path.display(),
        vfs,
        readonly
    );
    let conn = Connection::open_with_flags_and_vfs(path, open_flags(readonly), &vfs)?;
    Ok(Database {
        conn,
        _registration: registration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::registry::test_support::fresh;
    use crate::error::VfsError;
    use crate::vfs::{connection_count, open_file_count, teardown};
    use tempfile::TempDir;

    #[test]
    fn test_open_flags() {
        assert!(open_flags(true).contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
        assert!(!open_flags(true).contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(open_flags(false).contains(OpenFlags::SQLITE_OPEN_READ_WRITE));
        assert!(open_flags(false).contains(OpenFlags::SQLITE_OPEN_CREATE));
    }

    #[test]
    fn test_create_write_reopen_readonly() {
        let _guard = fresh();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.db");

        {
            let conn = open_database(&path, false).unwrap();
            conn.execute_batch(
                "CREATE TABLE scores (name TEXT, points INTEGER);
                 INSERT INTO scores VALUES ('ada', 30), ('bob', 12);",
            )
            .unwrap();
        }
        assert!(path.exists());
        assert_eq!(open_file_count(), 0);

        let conn = open_database(&path, true).unwrap();
        let total: i64 = conn
            .query_row("SELECT SUM(points) FROM scores", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 42);

        let err = conn.execute("INSERT INTO scores VALUES ('eve', 1)", []);
        assert!(err.is_err());

        drop(conn);
        teardown().unwrap();
    }

    #[test]
    fn test_readonly_missing_file_fails() {
        let _guard = fresh();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.db");

        assert!(open_database(&path, true).is_err());
        assert!(!path.exists());
        teardown().unwrap();
    }

    #[test]
    fn test_rollback_leaves_no_trace() {
        let _guard = fresh();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tx.db");

        let mut conn = open_database(&path, false).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let tx = conn.transaction().unwrap();
        tx.execute("INSERT INTO t VALUES (1)", []).unwrap();
        tx.rollback().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(!dir.path().join("tx.db-journal").exists());

        drop(conn);
        teardown().unwrap();
    }

    #[test]
    fn test_memory_database_blocks_teardown() {
        let _guard = fresh();
        let conn = open_database(":memory:", false).unwrap();
        conn.execute_batch("CREATE TABLE t (x)").unwrap();
        assert_eq!(open_file_count(), 0);
        assert_eq!(connection_count(), 1);

        assert!(matches!(
            teardown(),
            Err(VfsError::InUse { connections: 1, .. })
        ));

        drop(conn);
        assert_eq!(connection_count(), 0);
        teardown().unwrap();
    }

    #[test]
    fn test_close_releases_registration() {
        let _guard = fresh();
        let dir = TempDir::new().unwrap();
        let conn = open_database(dir.path().join("closed.db"), false).unwrap();
        conn.execute_batch("CREATE TABLE t (x)").unwrap();

        conn.close().unwrap();
        assert_eq!(connection_count(), 0);
        teardown().unwrap();
    }

    #[test]
    fn test_failed_open_releases_registration() {
        let _guard = fresh();
        let dir = TempDir::new().unwrap();
        assert!(open_database(dir.path().join("absent.db"), true).is_err());
        assert_eq!(connection_count(), 0);
        teardown().unwrap();
    }
}
