//! SQLite file I/O methods over a host file
//!
//! [`FileHandle`] owns exactly one host file. The `extern "C"` functions at
//! the bottom of this module form the `sqlite3_io_methods` v1 table that
//! SQLite calls through; each one recovers the handle from the
//! `sqlite3_file` record and defers to the safe [`VfsFile`] implementation.

use super::outcome::{to_code, IoFailure, IoOp};
use super::registry::VfsDescriptor;
use super::VfsFile;
use crate::error::HostError;
use crate::host::{base_dir, HostFile, HostFileSystem, OpenMode};
use libsqlite3_sys as ffi;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Sector size reported to SQLite (SQLITE_DEFAULT_SECTOR_SIZE)
pub const SECTOR_SIZE: c_int = 4096;

/// Lock levels SQLite requests; the adapter only records them in traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockLevel {
    None,
    Shared,
    Reserved,
    Pending,
    Exclusive,
}

impl LockLevel {
    pub fn from_raw(level: c_int) -> Self {
        match level {
            ffi::SQLITE_LOCK_SHARED => LockLevel::Shared,
            ffi::SQLITE_LOCK_RESERVED => LockLevel::Reserved,
            ffi::SQLITE_LOCK_PENDING => LockLevel::Pending,
            ffi::SQLITE_LOCK_EXCLUSIVE => LockLevel::Exclusive,
            _ => LockLevel::None,
        }
    }
}

/// Holds one unit of a descriptor usage counter until dropped
#[derive(Debug)]
pub(crate) struct UsageToken(Arc<AtomicUsize>);

impl UsageToken {
    pub(crate) fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        UsageToken(Arc::clone(counter))
    }
}

impl Drop for UsageToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One open database, journal or temp file
pub struct FileHandle {
    /// Owned host file; `None` once closed
    file: Option<Box<dyn HostFile>>,
    /// Host path the file was opened under
    path: String,
    /// Remove the host file when the handle closes
    delete_on_close: bool,
    /// Host used for delete-on-close
    host: Arc<dyn HostFileSystem>,
    /// Open-file accounting for the registered VFS
    token: Option<UsageToken>,
}

/// Map SQLite open flags onto a host open mode
pub fn open_mode(flags: c_int) -> OpenMode {
    if flags & ffi::SQLITE_OPEN_READWRITE == 0 {
        OpenMode::Read
    } else if flags & ffi::SQLITE_OPEN_CREATE != 0 {
        OpenMode::ReadWriteCreate
    } else {
        OpenMode::ReadWrite
    }
}

/// Unique host path for a file SQLite opens without a name
fn temp_path() -> String {
    let dir = std::env::temp_dir();
    let name = format!("hostvfs-{:016x}.tmp", rand::random::<u64>());
    dir.join(name).to_string_lossy().into_owned()
}

fn host_failure(path: &str, op: IoOp, err: HostError) -> IoFailure {
    let failure = IoFailure::from_host(op, &err);
    warn!("{:?} on {} failed: {} ({})", op, path, err, failure);
    failure
}

impl FileHandle {
    /// Open a host file for SQLite
    ///
    /// Returns the handle and the open flags actually granted. A read-write
    /// request the host refuses for reasons other than a missing file is
    /// retried read-only, and the granted flags say so.
    pub fn open(
        host: Arc<dyn HostFileSystem>,
        path: Option<&str>,
        flags: c_int,
    ) -> Result<(Self, c_int), IoFailure> {
        let (path, delete_on_close) = match path {
            Some(p) => (p.to_string(), flags & ffi::SQLITE_OPEN_DELETEONCLOSE != 0),
            None => (temp_path(), true),
        };

        let mode = open_mode(flags);
        let (file, granted) = match host.open(&path, mode) {
            Ok(file) => (file, flags),
            Err(err) if mode.is_writable() && !err.is_not_found() => {
                debug!("{} refused read-write ({}), retrying read-only", path, err);
                let file = host
                    .open(&path, OpenMode::Read)
                    .map_err(|e| host_failure(&path, IoOp::Open, e))?;
                let granted = (flags & !(ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE))
                    | ffi::SQLITE_OPEN_READONLY;
                (file, granted)
            }
            Err(err) => return Err(host_failure(&path, IoOp::Open, err)),
        };

        if !file.is_open() {
            warn!("host returned a closed file for {}", path);
            return Err(IoFailure::CantOpen);
        }

        debug!("Opened {} ({:?}, flags {:#x})", path, mode, granted);
        Ok((
            FileHandle {
                file: Some(file),
                path,
                delete_on_close,
                host,
                token: None,
            },
            granted,
        ))
    }

    /// Host path backing this handle
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the host file is still open
    pub fn is_open(&self) -> bool {
        self.file.as_ref().map_or(false, |f| f.is_open())
    }

    pub(crate) fn track(&mut self, token: UsageToken) {
        self.token = Some(token);
    }

    /// Path and open host file, or the close error when there is none
    fn parts(&mut self) -> Result<(&str, &mut dyn HostFile), IoFailure> {
        match self.file.as_mut() {
            Some(file) if file.is_open() => Ok((&self.path, file.as_mut())),
            _ => {
                debug!("I/O on closed handle {}", self.path);
                Err(IoFailure::Close)
            }
        }
    }

    fn remove_backing_file(&self) {
        let removed = self
            .host
            .open_dir(base_dir(&self.path))
            .and_then(|mut dir| dir.remove(&self.path));
        match removed {
            Ok(()) => debug!("Deleted {} on close", self.path),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("delete-on-close of {} failed: {}", self.path, e),
        }
    }
}

impl VfsFile for FileHandle {
    fn close(&mut self) -> Result<(), IoFailure> {
        let mut file = match self.file.take() {
            Some(file) if file.is_open() => file,
            _ => return Err(IoFailure::Close),
        };
        file.close();
        drop(file);
        self.token = None;

        if self.delete_on_close {
            self.remove_backing_file();
        }
        debug!("Closed {}", self.path);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<(), IoFailure> {
        let (path, file) = self.parts()?;
        trace!("read {} bytes at {} from {}", buf.len(), offset, path);

        file.seek(offset)
            .map_err(|e| host_failure(path, IoOp::Read, e))?;
        let n = file
            .get_buffer(buf)
            .map_err(|e| host_failure(path, IoOp::Read, e))?;

        if n < buf.len() {
            // SQLite requires the unread tail zeroed on a short read
            buf[n..].fill(0);
            trace!("short read on {}: {} of {} bytes", path, n, buf.len());
            return Err(IoFailure::ShortRead);
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<(), IoFailure> {
        let (path, file) = self.parts()?;
        trace!("write {} bytes at {} to {}", buf.len(), offset, path);

        file.seek(offset)
            .map_err(|e| host_failure(path, IoOp::Write, e))?;
        let stored = file.store_buffer(buf);
        let written = file.position().saturating_sub(offset);
        stored.map_err(|e| host_failure(path, IoOp::Write, e))?;

        if written != buf.len() as u64 {
            warn!(
                "short write on {}: {} of {} bytes at {}",
                path,
                written,
                buf.len(),
                offset
            );
            return Err(IoFailure::Write);
        }
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<(), IoFailure> {
        let (path, file) = self.parts()?;
        trace!("truncate {} to {}", path, size);
        file.resize(size)
            .map_err(|e| host_failure(path, IoOp::Truncate, e))
    }

    fn sync(&mut self, flags: c_int) -> Result<(), IoFailure> {
        let (path, file) = self.parts()?;
        trace!("sync {} (flags {:#x})", path, flags);
        file.flush().map_err(|e| host_failure(path, IoOp::Sync, e))
    }

    fn file_size(&mut self) -> Result<u64, IoFailure> {
        let (path, file) = self.parts()?;
        file.length()
            .map_err(|e| host_failure(path, IoOp::FileSize, e))
    }

    fn lock(&mut self, level: LockLevel) -> Result<(), IoFailure> {
        let (path, _) = self.parts()?;
        trace!("lock {:?} on {} (not enforced)", level, path);
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<(), IoFailure> {
        let (path, _) = self.parts()?;
        trace!("unlock {:?} on {} (not enforced)", level, path);
        Ok(())
    }

    fn check_reserved_lock(&mut self) -> Result<bool, IoFailure> {
        self.parts()?;
        Ok(false)
    }

    fn file_control(&mut self, op: c_int) -> Result<(), IoFailure> {
        let (path, _) = self.parts()?;
        trace!("file control {} on {}: not supported", op, path);
        Err(IoFailure::NotSupported)
    }

    fn sector_size(&self) -> c_int {
        SECTOR_SIZE
    }

    fn device_characteristics(&self) -> c_int {
        0
    }
}

/// SQLite file record extended with the owned handle
#[repr(C)]
pub(crate) struct RawFile {
    /// Base sqlite3_file structure (MUST be first field)
    base: ffi::sqlite3_file,
    handle: FileHandle,
}

pub(crate) static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(file_close),
    xRead: Some(file_read),
    xWrite: Some(file_write),
    xTruncate: Some(file_truncate),
    xSync: Some(file_sync),
    xFileSize: Some(file_file_size),
    xLock: Some(file_lock),
    xUnlock: Some(file_unlock),
    xCheckReservedLock: Some(file_check_reserved_lock),
    xFileControl: Some(file_file_control),
    xSectorSize: Some(file_sector_size),
    xDeviceCharacteristics: Some(file_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

unsafe fn handle<'a>(file: *mut ffi::sqlite3_file) -> Option<&'a mut FileHandle> {
    (file as *mut RawFile).as_mut().map(|raw| &mut raw.handle)
}

// VFS open callback

pub(crate) unsafe extern "C" fn file_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    if file.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    // SQLite skips xClose when the method table is left null
    (*file).pMethods = ptr::null();

    let descriptor = match VfsDescriptor::from_raw(vfs) {
        Some(d) => d,
        None => return ffi::SQLITE_ERROR,
    };

    let path = if z_name.is_null() {
        None
    } else {
        match CStr::from_ptr(z_name).to_str() {
            Ok(p) => Some(p),
            Err(_) => return ffi::SQLITE_CANTOPEN,
        }
    };

    let (mut handle, granted) = match FileHandle::open(descriptor.host(), path, flags) {
        Ok(opened) => opened,
        Err(failure) => return failure.code(),
    };
    handle.track(descriptor.open_file_token());

    if !p_out_flags.is_null() {
        *p_out_flags = granted;
    }

    ptr::write(
        file as *mut RawFile,
        RawFile {
            base: ffi::sqlite3_file {
                pMethods: &IO_METHODS,
            },
            handle,
        },
    );
    ffi::SQLITE_OK
}

// File I/O method implementations

unsafe extern "C" fn file_close(file: *mut ffi::sqlite3_file) -> c_int {
    let raw = match (file as *mut RawFile).as_mut() {
        Some(raw) => raw,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    let rc = to_code(raw.handle.close());
    // SQLite frees the record after xClose without running destructors
    ptr::drop_in_place(&mut raw.handle);
    raw.base.pMethods = ptr::null();
    rc
}

unsafe extern "C" fn file_read(
    file: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let handle = match handle(file) {
        Some(h) => h,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    if offset < 0 || amt < 0 || buf.is_null() {
        return ffi::SQLITE_IOERR_READ;
    }
    let buf = slice::from_raw_parts_mut(buf as *mut u8, amt as usize);
    to_code(handle.read(buf, offset as u64))
}

unsafe extern "C" fn file_write(
    file: *mut ffi::sqlite3_file,
    buf: *const c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let handle = match handle(file) {
        Some(h) => h,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    if offset < 0 || amt < 0 || buf.is_null() {
        return ffi::SQLITE_IOERR_WRITE;
    }
    let buf = slice::from_raw_parts(buf as *const u8, amt as usize);
    to_code(handle.write(buf, offset as u64))
}

unsafe extern "C" fn file_truncate(
    file: *mut ffi::sqlite3_file,
    size: ffi::sqlite3_int64,
) -> c_int {
    let handle = match handle(file) {
        Some(h) => h,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    if size < 0 {
        return ffi::SQLITE_IOERR_TRUNCATE;
    }
    to_code(handle.truncate(size as u64))
}

unsafe extern "C" fn file_sync(file: *mut ffi::sqlite3_file, flags: c_int) -> c_int {
    match handle(file) {
        Some(h) => to_code(h.sync(flags)),
        None => ffi::SQLITE_IOERR_CLOSE,
    }
}

unsafe extern "C" fn file_file_size(
    file: *mut ffi::sqlite3_file,
    p_size: *mut ffi::sqlite3_int64,
) -> c_int {
    let handle = match handle(file) {
        Some(h) => h,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    match handle.file_size() {
        Ok(size) => {
            if !p_size.is_null() {
                *p_size = size as ffi::sqlite3_int64;
            }
            ffi::SQLITE_OK
        }
        Err(failure) => failure.code(),
    }
}

unsafe extern "C" fn file_lock(file: *mut ffi::sqlite3_file, lock_type: c_int) -> c_int {
    match handle(file) {
        Some(h) => to_code(h.lock(LockLevel::from_raw(lock_type))),
        None => ffi::SQLITE_IOERR_CLOSE,
    }
}

unsafe extern "C" fn file_unlock(file: *mut ffi::sqlite3_file, lock_type: c_int) -> c_int {
    match handle(file) {
        Some(h) => to_code(h.unlock(LockLevel::from_raw(lock_type))),
        None => ffi::SQLITE_IOERR_CLOSE,
    }
}

unsafe extern "C" fn file_check_reserved_lock(
    file: *mut ffi::sqlite3_file,
    p_res_out: *mut c_int,
) -> c_int {
    let handle = match handle(file) {
        Some(h) => h,
        None => return ffi::SQLITE_IOERR_CLOSE,
    };
    match handle.check_reserved_lock() {
        Ok(reserved) => {
            if !p_res_out.is_null() {
                *p_res_out = reserved as c_int;
            }
            ffi::SQLITE_OK
        }
        Err(failure) => failure.code(),
    }
}

unsafe extern "C" fn file_file_control(
    file: *mut ffi::sqlite3_file,
    op: c_int,
    _p_arg: *mut c_void,
) -> c_int {
    match handle(file) {
        Some(h) => to_code(h.file_control(op)),
        None => ffi::SQLITE_NOTFOUND,
    }
}

unsafe extern "C" fn file_sector_size(_file: *mut ffi::sqlite3_file) -> c_int {
    SECTOR_SIZE
}

unsafe extern "C" fn file_device_characteristics(_file: *mut ffi::sqlite3_file) -> c_int {
    // No atomic-write or safe-append guarantees
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::Faults;
    use crate::host::MemoryFileSystem;

    const RWC: c_int = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;

    fn open(fs: &MemoryFileSystem, path: &str, flags: c_int) -> FileHandle {
        FileHandle::open(Arc::new(fs.clone()), Some(path), flags)
            .unwrap()
            .0
    }

    #[test]
    fn test_open_mode_from_flags() {
        assert_eq!(open_mode(ffi::SQLITE_OPEN_READONLY), OpenMode::Read);
        assert_eq!(open_mode(ffi::SQLITE_OPEN_READWRITE), OpenMode::ReadWrite);
        assert_eq!(open_mode(RWC), OpenMode::ReadWriteCreate);
    }

    #[test]
    fn test_write_then_read_at_offset() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);

        file.write(b"page one", 4096).unwrap();
        let mut buf = [0u8; 8];
        file.read(&mut buf, 4096).unwrap();
        assert_eq!(&buf, b"page one");
        assert_eq!(file.file_size().unwrap(), 4104);
    }

    #[test]
    fn test_short_read_zero_fills_and_fails() {
        let fs = MemoryFileSystem::new();
        fs.insert("/db", b"abc");
        let mut file = open(&fs, "/db", RWC);

        let mut buf = [0xEEu8; 6];
        assert_eq!(file.read(&mut buf, 1), Err(IoFailure::ShortRead));
        assert_eq!(&buf, &[b'b', b'c', 0, 0, 0, 0]);
    }

    #[test]
    fn test_read_error_maps_to_read() {
        let fs = MemoryFileSystem::new();
        fs.insert("/db", b"abcdef");
        let mut file = open(&fs, "/db", RWC);
        fs.set_faults(Faults {
            fail_read: true,
            ..Faults::default()
        });

        let mut buf = [0u8; 2];
        let err = file.read(&mut buf, 0).unwrap_err();
        assert_eq!(err.code(), ffi::SQLITE_IOERR_READ);
    }

    #[test]
    fn test_short_write_is_failure() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        fs.set_faults(Faults {
            short_write: Some(10),
            ..Faults::default()
        });

        let err = file.write(&[7u8; 100], 0).unwrap_err();
        assert_eq!(err.code(), ffi::SQLITE_IOERR_WRITE);

        fs.clear_faults();
        file.write(&[7u8; 100], 0).unwrap();
    }

    #[test]
    fn test_huge_offsets_fail_without_aborting() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/big.db", RWC);

        assert_eq!(file.write(b"x", 1 << 62), Err(IoFailure::Write));
        assert_eq!(file.write(b"x", u64::MAX), Err(IoFailure::Write));
        assert_eq!(file.truncate(1 << 62), Err(IoFailure::Truncate));
        assert_eq!(file.file_size().unwrap(), 0);

        file.write(b"ok", 0).unwrap();
        assert_eq!(fs.contents("/big.db").unwrap(), b"ok".to_vec());
    }

    #[test]
    fn test_truncate_then_size() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        file.write(&[1u8; 200], 0).unwrap();

        file.truncate(50).unwrap();
        assert_eq!(file.file_size().unwrap(), 50);

        file.truncate(8192).unwrap();
        assert_eq!(file.file_size().unwrap(), 8192);
    }

    #[test]
    fn test_truncate_read_only_fails() {
        let fs = MemoryFileSystem::new();
        fs.insert("/db", &[1u8; 100]);
        let mut file = open(&fs, "/db", ffi::SQLITE_OPEN_READONLY);

        let err = file.truncate(50).unwrap_err();
        assert_eq!(err.code(), ffi::SQLITE_IOERR_TRUNCATE);
        assert_eq!(fs.contents("/db").unwrap().len(), 100);
    }

    #[test]
    fn test_sync_failure_maps_to_fsync() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        file.sync(ffi::SQLITE_SYNC_NORMAL).unwrap();

        fs.set_faults(Faults {
            fail_flush: true,
            ..Faults::default()
        });
        assert_eq!(
            file.sync(ffi::SQLITE_SYNC_FULL).unwrap_err().code(),
            ffi::SQLITE_IOERR_FSYNC
        );
    }

    #[test]
    fn test_closed_handle_fails_every_operation() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        file.close().unwrap();
        assert!(!file.is_open());

        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf, 0), Err(IoFailure::Close));
        assert_eq!(file.write(&buf, 0), Err(IoFailure::Close));
        assert_eq!(file.truncate(0), Err(IoFailure::Close));
        assert_eq!(file.sync(0), Err(IoFailure::Close));
        assert_eq!(file.file_size(), Err(IoFailure::Close));
        assert_eq!(file.lock(LockLevel::Shared), Err(IoFailure::Close));
        assert_eq!(file.check_reserved_lock(), Err(IoFailure::Close));
        assert_eq!(
            file.file_control(ffi::SQLITE_FCNTL_SIZE_HINT),
            Err(IoFailure::Close)
        );
        assert_eq!(file.close(), Err(IoFailure::Close));
        assert_eq!(IoFailure::Close.code(), ffi::SQLITE_IOERR_CLOSE);
    }

    #[test]
    fn test_locks_never_exclude() {
        let fs = MemoryFileSystem::new();
        let mut a = open(&fs, "/db", RWC);
        let mut b = open(&fs, "/db", RWC);

        a.lock(LockLevel::Exclusive).unwrap();
        b.lock(LockLevel::Exclusive).unwrap();
        assert!(!a.check_reserved_lock().unwrap());
        assert!(!b.check_reserved_lock().unwrap());
        a.unlock(LockLevel::None).unwrap();
        a.unlock(LockLevel::None).unwrap();
    }

    #[test]
    fn test_constant_characteristics() {
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        assert_eq!(file.sector_size(), 4096);
        assert_eq!(file.device_characteristics(), 0);
        for op in [
            ffi::SQLITE_FCNTL_LOCKSTATE,
            ffi::SQLITE_FCNTL_SIZE_HINT,
            ffi::SQLITE_FCNTL_PRAGMA,
            12345,
        ] {
            assert_eq!(file.file_control(op), Err(IoFailure::NotSupported));
        }
    }

    #[test]
    fn test_open_failure_is_cantopen() {
        let fs = MemoryFileSystem::new();
        let err = FileHandle::open(Arc::new(fs.clone()), Some("/missing"), ffi::SQLITE_OPEN_READWRITE)
            .err()
            .unwrap();
        assert_eq!(err.code(), ffi::SQLITE_CANTOPEN);

        fs.set_faults(Faults {
            fail_open: true,
            ..Faults::default()
        });
        let err = FileHandle::open(Arc::new(fs.clone()), Some("/any"), RWC)
            .err()
            .unwrap();
        assert_eq!(err, IoFailure::CantOpen);
    }

    #[test]
    fn test_temp_file_deleted_on_close() {
        let fs = MemoryFileSystem::new();
        let flags = RWC | ffi::SQLITE_OPEN_DELETEONCLOSE | ffi::SQLITE_OPEN_TEMP_JOURNAL;
        let (mut file, _) = FileHandle::open(Arc::new(fs.clone()), None, flags).unwrap();

        assert!(file.path().contains("hostvfs-"));
        file.write(b"spill", 0).unwrap();
        assert_eq!(fs.file_count(), 1);

        file.close().unwrap();
        assert_eq!(fs.file_count(), 0);
    }

    #[test]
    fn test_usage_token_counts() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fs = MemoryFileSystem::new();
        let mut file = open(&fs, "/db", RWC);
        file.track(UsageToken::new(&counter));
        assert_eq!(counter.load(Ordering::Acquire), 1);

        file.close().unwrap();
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }
}
