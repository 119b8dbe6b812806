//! Translation between host outcomes and SQLite result codes
//!
//! Every adapter boundary funnels through here. Host success becomes
//! `SQLITE_OK`; "not found" on delete becomes `SQLITE_IOERR_DELETE_NOENT`,
//! which SQLite's recovery logic treats as benign; every other host failure
//! becomes the I/O error code of the operation that was attempted.

use crate::error::HostError;
use libsqlite3_sys as ffi;
use std::os::raw::c_int;
use thiserror::Error;

/// Adapter operation an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Open,
    Read,
    Write,
    Truncate,
    Sync,
    Close,
    FileSize,
    Delete,
}

/// Typed form of the non-OK codes the adapter reports
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoFailure {
    #[error("read failed")]
    Read,

    #[error("short read")]
    ShortRead,

    #[error("write failed")]
    Write,

    #[error("truncate failed")]
    Truncate,

    #[error("sync failed")]
    Fsync,

    #[error("file is closed")]
    Close,

    #[error("file size unavailable")]
    Fstat,

    #[error("delete failed")]
    Delete,

    #[error("deleted file does not exist")]
    DeleteNoent,

    #[error("cannot open file")]
    CantOpen,

    #[error("operation not supported")]
    NotSupported,
}

impl IoFailure {
    /// Extended SQLite result code
    pub fn code(self) -> c_int {
        match self {
            IoFailure::Read => ffi::SQLITE_IOERR_READ,
            IoFailure::ShortRead => ffi::SQLITE_IOERR_SHORT_READ,
            IoFailure::Write => ffi::SQLITE_IOERR_WRITE,
            IoFailure::Truncate => ffi::SQLITE_IOERR_TRUNCATE,
            IoFailure::Fsync => ffi::SQLITE_IOERR_FSYNC,
            IoFailure::Close => ffi::SQLITE_IOERR_CLOSE,
            IoFailure::Fstat => ffi::SQLITE_IOERR_FSTAT,
            IoFailure::Delete => ffi::SQLITE_IOERR_DELETE,
            IoFailure::DeleteNoent => ffi::SQLITE_IOERR_DELETE_NOENT,
            IoFailure::CantOpen => ffi::SQLITE_CANTOPEN,
            IoFailure::NotSupported => ffi::SQLITE_NOTFOUND,
        }
    }

    /// Failure reported for `op` when the host call itself failed
    pub fn for_op(op: IoOp) -> Self {
        match op {
            IoOp::Open => IoFailure::CantOpen,
            IoOp::Read => IoFailure::Read,
            IoOp::Write => IoFailure::Write,
            IoOp::Truncate => IoFailure::Truncate,
            IoOp::Sync => IoFailure::Fsync,
            IoOp::Close => IoFailure::Close,
            IoOp::FileSize => IoFailure::Fstat,
            IoOp::Delete => IoFailure::Delete,
        }
    }

    /// Map a host error raised while performing `op`
    pub fn from_host(op: IoOp, err: &HostError) -> Self {
        match (op, err) {
            (IoOp::Delete, e) if e.is_not_found() => IoFailure::DeleteNoent,
            (_, HostError::Closed) => IoFailure::Close,
            (op, _) => IoFailure::for_op(op),
        }
    }
}

/// Collapse an adapter result into the code handed back to SQLite
pub fn to_code<T>(result: Result<T, IoFailure>) -> c_int {
    match result {
        Ok(_) => ffi::SQLITE_OK,
        Err(failure) => failure.code(),
    }
}
