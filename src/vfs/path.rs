//! Path and directory operations: delete, access checks, full pathname

use super::file::FileHandle;
use super::outcome::{to_code, IoFailure, IoOp};
use super::registry::VfsDescriptor;
use super::VfsFileSystem;
use crate::host::{base_dir, HostFileSystem, OpenMode};
use libsqlite3_sys as ffi;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::slice;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Access check SQLite asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Exists,
    ReadWrite,
    /// Any other flag value; always answered "no"
    Other(c_int),
}

impl AccessMode {
    pub fn from_raw(flags: c_int) -> Self {
        match flags {
            ffi::SQLITE_ACCESS_EXISTS => AccessMode::Exists,
            ffi::SQLITE_ACCESS_READWRITE => AccessMode::ReadWrite,
            other => AccessMode::Other(other),
        }
    }
}

/// Filesystem-level half of the adapter, bound to one host
#[derive(Clone)]
pub struct HostVfs {
    host: Arc<dyn HostFileSystem>,
}

impl HostVfs {
    pub fn new(host: Arc<dyn HostFileSystem>) -> Self {
        HostVfs { host }
    }

    pub fn host(&self) -> Arc<dyn HostFileSystem> {
        Arc::clone(&self.host)
    }
}

impl VfsFileSystem for HostVfs {
    type File = FileHandle;

    fn open(&self, path: Option<&str>, flags: c_int) -> Result<(FileHandle, c_int), IoFailure> {
        FileHandle::open(self.host(), path, flags)
    }

    fn delete(&self, path: &str, sync_dir: bool) -> Result<(), IoFailure> {
        debug!("Deleting {} (sync_dir: {})", path, sync_dir);
        let removed = self
            .host
            .open_dir(base_dir(path))
            .and_then(|mut dir| dir.remove(path));

        match removed {
            Ok(()) => Ok(()),
            Err(err) => {
                let failure = IoFailure::from_host(IoOp::Delete, &err);
                if failure == IoFailure::DeleteNoent {
                    debug!("Delete of missing file {}", path);
                } else {
                    warn!("Delete of {} failed: {}", path, err);
                }
                Err(failure)
            }
        }
    }

    fn access(&self, path: &str, mode: AccessMode) -> bool {
        let granted = match mode {
            AccessMode::Exists => self.host.exists(path),
            AccessMode::ReadWrite => match self.host.open(path, OpenMode::ReadWrite) {
                Ok(mut trial) => {
                    trial.close();
                    true
                }
                Err(_) => false,
            },
            AccessMode::Other(_) => false,
        };
        trace!("access {:?} on {}: {}", mode, path, granted);
        granted
    }

    fn full_pathname(&self, path: &[u8], out: &mut [u8]) -> Result<usize, IoFailure> {
        // Paths pass through untouched; the host resolves them
        if path.len() >= out.len() {
            warn!(
                "path of {} bytes does not fit a {} byte buffer",
                path.len(),
                out.len()
            );
            return Err(IoFailure::CantOpen);
        }
        out[..path.len()].copy_from_slice(path);
        out[path.len()] = 0;
        Ok(path.len())
    }
}

// VFS callback functions

pub(crate) unsafe extern "C" fn vfs_delete(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    sync_dir: c_int,
) -> c_int {
    let descriptor = match VfsDescriptor::from_raw(vfs) {
        Some(d) => d,
        None => return ffi::SQLITE_ERROR,
    };
    if z_name.is_null() {
        return ffi::SQLITE_IOERR_DELETE;
    }
    let path = match CStr::from_ptr(z_name).to_str() {
        Ok(p) => p,
        Err(_) => return ffi::SQLITE_IOERR_DELETE,
    };

    to_code(descriptor.vfs().delete(path, sync_dir != 0))
}

pub(crate) unsafe extern "C" fn vfs_access(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    flags: c_int,
    p_res_out: *mut c_int,
) -> c_int {
    let descriptor = match VfsDescriptor::from_raw(vfs) {
        Some(d) => d,
        None => return ffi::SQLITE_ERROR,
    };
    if p_res_out.is_null() {
        return ffi::SQLITE_MISUSE;
    }

    let granted = if z_name.is_null() {
        false
    } else {
        match CStr::from_ptr(z_name).to_str() {
            Ok(path) => descriptor.vfs().access(path, AccessMode::from_raw(flags)),
            Err(_) => false,
        }
    };

    *p_res_out = granted as c_int;
    ffi::SQLITE_OK
}

pub(crate) unsafe extern "C" fn vfs_full_pathname(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    n_out: c_int,
    z_out: *mut c_char,
) -> c_int {
    let descriptor = match VfsDescriptor::from_raw(vfs) {
        Some(d) => d,
        None => return ffi::SQLITE_ERROR,
    };
    if z_name.is_null() || z_out.is_null() || n_out <= 0 {
        return ffi::SQLITE_CANTOPEN;
    }

    let path = CStr::from_ptr(z_name).to_bytes();
    let out = slice::from_raw_parts_mut(z_out as *mut u8, n_out as usize);
    to_code(descriptor.vfs().full_pathname(path, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::Faults;
    use crate::host::MemoryFileSystem;

    fn vfs(fs: &MemoryFileSystem) -> HostVfs {
        HostVfs::new(Arc::new(fs.clone()))
    }

    #[test]
    fn test_delete_existing() {
        let fs = MemoryFileSystem::new();
        fs.insert("/saves/a.db-journal", b"j");
        vfs(&fs).delete("/saves/a.db-journal", true).unwrap();
        assert!(!fs.exists("/saves/a.db-journal"));
    }

    #[test]
    fn test_delete_missing_vs_blocked() {
        let fs = MemoryFileSystem::new();
        let v = vfs(&fs);

        let missing = v.delete("/saves/none.db", false).unwrap_err();
        assert_eq!(missing.code(), ffi::SQLITE_IOERR_DELETE_NOENT);

        fs.insert("/saves/locked.db", b"x");
        fs.set_faults(Faults {
            fail_remove: true,
            ..Faults::default()
        });
        let blocked = v.delete("/saves/locked.db", false).unwrap_err();
        assert_eq!(blocked.code(), ffi::SQLITE_IOERR_DELETE);
        assert!(fs.exists("/saves/locked.db"));
    }

    #[test]
    fn test_access_exists_before_and_after_create() {
        let fs = MemoryFileSystem::new();
        let v = vfs(&fs);

        assert!(!v.access("/new.db", AccessMode::Exists));
        let flags = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        let (_file, _) = v.open(Some("/new.db"), flags).unwrap();
        assert!(v.access("/new.db", AccessMode::Exists));
    }

    #[test]
    fn test_access_readwrite_check() {
        let fs = MemoryFileSystem::new();
        let v = vfs(&fs);

        assert!(!v.access("/check.db", AccessMode::ReadWrite));
        // The check must not create the file
        assert!(!fs.exists("/check.db"));

        fs.insert("/check.db", b"");
        assert!(v.access("/check.db", AccessMode::ReadWrite));
    }

    #[test]
    fn test_access_other_modes_say_no() {
        let fs = MemoryFileSystem::new();
        fs.insert("/x.db", b"");
        let v = vfs(&fs);
        assert_eq!(
            AccessMode::from_raw(ffi::SQLITE_ACCESS_READ),
            AccessMode::Other(ffi::SQLITE_ACCESS_READ)
        );
        assert!(!v.access("/x.db", AccessMode::from_raw(ffi::SQLITE_ACCESS_READ)));
        assert!(!v.access("/x.db", AccessMode::Other(99)));
    }

    #[test]
    fn test_full_pathname_copies_unchanged() {
        let v = vfs(&MemoryFileSystem::new());
        let mut out = [0xAAu8; 32];
        let n = v.full_pathname(b"./a/../b.db", &mut out).unwrap();
        assert_eq!(&out[..n], b"./a/../b.db");
        assert_eq!(out[n], 0);
    }

    #[test]
    fn test_full_pathname_never_overflows() {
        let v = vfs(&MemoryFileSystem::new());
        let mut out = [0xAAu8; 8];

        assert_eq!(
            v.full_pathname(b"12345678", &mut out),
            Err(IoFailure::CantOpen)
        );
        assert_eq!(out, [0xAAu8; 8]);

        assert_eq!(v.full_pathname(b"1234567", &mut out), Ok(7));
        assert_eq!(out[7], 0);
    }
}
