//! SQLite VFS adapter over a host file-access layer
//!
//! This module provides a custom SQLite VFS whose every file operation is
//! delegated to a [`HostFileSystem`](crate::host::HostFileSystem):
//!
//! - [`outcome`] translates host outcomes into SQLite result codes
//! - [`file`] adapts one open host file to `sqlite3_io_methods`
//! - [`path`] handles delete, access checks and path resolution
//! - [`env`] forwards randomness and clocks to the platform's default VFS
//! - [`registry`] owns the process-wide `sqlite3_vfs` registration
//!
//! # Locking
//!
//! `lock`/`unlock` succeed without coordinating anything. Two processes (or
//! two connections in one process) writing the same database file through
//! this VFS are NOT protected from each other. Only use it where a single
//! connection owns each database file at a time.

pub mod env;
pub mod file;
pub mod outcome;
pub mod path;
pub mod registry;

pub use file::{FileHandle, LockLevel, SECTOR_SIZE};
pub use outcome::{IoFailure, IoOp};
pub use path::{AccessMode, HostVfs};
pub use registry::{
    connection_count, ensure_registered, ensure_registered_with, is_registered, open_file_count,
    registered_name, registered_vfs_names, teardown,
};

use std::os::raw::c_int;

/// Per-file capability set, the Rust face of `sqlite3_io_methods` v1
pub trait VfsFile {
    fn close(&mut self) -> Result<(), IoFailure>;
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<(), IoFailure>;
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<(), IoFailure>;
    fn truncate(&mut self, size: u64) -> Result<(), IoFailure>;
    fn sync(&mut self, flags: c_int) -> Result<(), IoFailure>;
    fn file_size(&mut self) -> Result<u64, IoFailure>;
    fn lock(&mut self, level: LockLevel) -> Result<(), IoFailure>;
    fn unlock(&mut self, level: LockLevel) -> Result<(), IoFailure>;
    fn check_reserved_lock(&mut self) -> Result<bool, IoFailure>;
    fn file_control(&mut self, op: c_int) -> Result<(), IoFailure>;
    fn sector_size(&self) -> c_int;
    fn device_characteristics(&self) -> c_int;
}

/// Filesystem capability set, the file-level half of `sqlite3_vfs`
pub trait VfsFileSystem {
    type File: VfsFile;

    /// Open `path` (or a fresh temporary file when `None`) with SQLite open
    /// flags; returns the file and the flags actually granted
    fn open(&self, path: Option<&str>, flags: c_int) -> Result<(Self::File, c_int), IoFailure>;

    fn delete(&self, path: &str, sync_dir: bool) -> Result<(), IoFailure>;

    fn access(&self, path: &str, mode: AccessMode) -> bool;

    /// Write the resolved path plus a NUL into `out`; returns the path length
    fn full_pathname(&self, path: &[u8], out: &mut [u8]) -> Result<usize, IoFailure>;
}
