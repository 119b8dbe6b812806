//! Error types for the host VFS adapter
//!
//! Two vocabularies live here. [`VfsError`] is what the Rust-facing API
//! returns (registration, configuration, database open). [`HostError`] is
//! the outcome vocabulary of the host file-access layer; the adapter never
//! hands it to SQLite directly but translates it through
//! [`crate::vfs::outcome`].

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("VFS registration failed: {0}")]
    RegistrationFailed(i32),

    #[error("VFS unregistration failed: {0}")]
    UnregistrationFailed(i32),

    #[error("A VFS named '{0}' is already registered")]
    NameTaken(String),

    #[error("VFS '{name}' still has {open_files} open file(s) and {connections} connection(s)")]
    InUse {
        name: String,
        open_files: usize,
        connections: usize,
    },

    #[error("Invalid VFS configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VfsError>;

/// Outcome of a host file-access call that did not succeed
#[derive(Error, Debug)]
pub enum HostError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File is open read-only")]
    ReadOnly,

    #[error("File is closed")]
    Closed,

    #[error("Host operation failed: {0}")]
    Failed(String),

    #[error("Host I/O error: {0}")]
    Io(io::Error),
}

impl HostError {
    /// True for the "not found" outcome, which callers treat differently on delete
    pub fn is_not_found(&self) -> bool {
        match self {
            HostError::NotFound(_) => true,
            HostError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            HostError::NotFound(err.to_string())
        } else {
            HostError::Io(err)
        }
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;
