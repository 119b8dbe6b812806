//! Host file-access abstraction
//!
//! The adapter performs no operating system calls of its own. Everything it
//! needs from storage goes through these three traits:
//!
//! - [`HostFileSystem`] opens files and directories and answers existence checks
//! - [`HostFile`] is one open file with a cursor (seek, read, write, resize, flush)
//! - [`HostDirectory`] removes entries from a directory
//!
//! Two implementations ship with the crate: [`StdFileSystem`] on top of
//! `std::fs`, and [`MemoryFileSystem`] which keeps files in process memory
//! and can inject failures.

pub mod memory;
pub mod std_fs;

pub use memory::MemoryFileSystem;
pub use std_fs::StdFileSystem;

use crate::error::HostResult;

/// How a host file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reads only
    Read,
    /// Existing file, reads and writes
    ReadWrite,
    /// Reads and writes, creating the file when missing (never truncates)
    ReadWriteCreate,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// One open host file
///
/// All I/O is cursor based: callers `seek` then read or write. `position`
/// reflects how far the last read or write actually got, which is what the
/// adapter uses to detect short writes.
pub trait HostFile: Send {
    /// Whether the file is still open
    fn is_open(&self) -> bool;

    /// Move the cursor to an absolute byte offset
    fn seek(&mut self, position: u64) -> HostResult<()>;

    /// Current cursor position
    fn position(&self) -> u64;

    /// Read up to `buf.len()` bytes at the cursor; returns the count read
    ///
    /// A count below `buf.len()` means end of file was reached.
    fn get_buffer(&mut self, buf: &mut [u8]) -> HostResult<usize>;

    /// Write `buf` at the cursor, advancing it by the bytes persisted
    fn store_buffer(&mut self, buf: &[u8]) -> HostResult<()>;

    /// Set the file length, zero-extending or discarding the tail
    fn resize(&mut self, len: u64) -> HostResult<()>;

    /// Push buffered writes to the backing storage
    fn flush(&mut self) -> HostResult<()>;

    /// Current length in bytes
    fn length(&self) -> HostResult<u64>;

    /// Release the underlying resource; later calls see `is_open() == false`
    fn close(&mut self);
}

/// A directory opened for entry management
pub trait HostDirectory {
    /// Remove the file at `path`
    fn remove(&mut self, path: &str) -> HostResult<()>;
}

/// Entry point into the host storage
pub trait HostFileSystem: Send + Sync {
    /// Open the file at `path`
    fn open(&self, path: &str, mode: OpenMode) -> HostResult<Box<dyn HostFile>>;

    /// Whether a file exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Open the directory at `path` for entry management
    fn open_dir(&self, path: &str) -> HostResult<Box<dyn HostDirectory>>;
}

/// Directory part of a path, the way the host resolves a file's parent
///
/// Returns an empty string for bare file names. A leading `/` is kept for
/// files in the root directory.
pub fn base_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}
