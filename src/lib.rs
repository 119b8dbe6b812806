//! # hostvfs - SQLite over a pluggable host file layer
//!
//! `hostvfs` registers a custom SQLite VFS that performs no operating system
//! calls of its own. Every open, read, write, truncate, sync, size query,
//! delete and existence check SQLite issues is routed through a
//! [`HostFileSystem`], so databases can live wherever the host can reach:
//! local disk, a virtual filesystem, an archive, or memory.
//!
//! - **Host abstraction**: [`HostFileSystem`], [`HostFile`] and [`HostDirectory`]
//! - **Two hosts included**: [`StdFileSystem`] (local disk) and
//!   [`MemoryFileSystem`] (in-memory, with fault injection)
//! - **One registration per process**: [`ensure_registered`] is idempotent
//!   and safe to call from any thread
//! - **Connection guard**: [`open_database`] returns a [`Database`] that keeps
//!   the registration alive until it is dropped
//!
//! Locking is not enforced. See [`vfs`] before sharing a database file
//! between connections.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hostvfs::{open_database, Result};
//! use rusqlite::params;
//!
//! # fn main() -> Result<()> {
//! let conn = open_database("player.db", false)?;
//! conn.execute_batch("CREATE TABLE IF NOT EXISTS inventory (item TEXT, qty INTEGER)")?;
//! conn.execute("INSERT INTO inventory VALUES (?1, ?2)", params!["potion", 3])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Host
//!
//! ```rust,no_run
//! use hostvfs::{ensure_registered_with, MemoryFileSystem, Result, VfsConfig};
//! use rusqlite::{Connection, OpenFlags};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let config = VfsConfig::new().name("memvfs");
//! let name = ensure_registered_with(Arc::new(MemoryFileSystem::new()), &config)?;
//!
//! let conn = Connection::open_with_flags_and_vfs(
//!     "/scratch.db",
//!     OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
//!     &name,
//! )?;
//! conn.execute_batch("CREATE TABLE t (x)")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod host;
pub mod vfs;

pub use config::VfsConfig;
pub use database::{open_database, Database};
pub use error::{HostError, HostResult, Result, VfsError};
pub use host::{
    HostDirectory, HostFile, HostFileSystem, MemoryFileSystem, OpenMode, StdFileSystem,
};
pub use vfs::{
    connection_count, ensure_registered, ensure_registered_with, is_registered, open_file_count,
    registered_name, teardown,
};
