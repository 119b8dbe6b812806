//! Process-wide VFS registration
//!
//! SQLite keeps a global list of VFS records. This module owns the one
//! record the adapter contributes: it is built and registered at most once
//! per process, stays registered while any connection or file uses it, and
//! can be torn down again once the last of them is gone.
//!
//! A torn-down record is unlinked from SQLite but never freed. Connections
//! opened by name outside [`open_database`](crate::open_database) are not
//! counted, and SQLite may still call through a record it looked up just
//! before teardown; both keep working against the retired record.

use super::env;
use super::file::{self, RawFile, UsageToken};
use super::path::{self, HostVfs};
use crate::config::VfsConfig;
use crate::error::{Result, VfsError};
use crate::host::{HostFileSystem, StdFileSystem};
use libsqlite3_sys as ffi;
use parking_lot::Mutex;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// SQLite VFS record extended with the adapter's own state
///
/// SQLite only ever sees `base`; callbacks cast the `sqlite3_vfs` pointer
/// they receive back to the full descriptor.
#[repr(C)]
pub(crate) struct VfsDescriptor {
    /// Base sqlite3_vfs structure (MUST be first field)
    base: ffi::sqlite3_vfs,
    /// Owns the bytes `base.zName` points at
    name: CString,
    vfs: HostVfs,
    open_files: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

// The raw pointers inside `base` are either static (method tables), owned by
// this descriptor (`zName`), or owned by SQLite (`pNext`, the default VFS)
unsafe impl Send for VfsDescriptor {}
unsafe impl Sync for VfsDescriptor {}

impl VfsDescriptor {
    fn new(
        name: CString,
        vfs: HostVfs,
        max_pathname: usize,
        default_vfs: *mut ffi::sqlite3_vfs,
    ) -> Self {
        let base = ffi::sqlite3_vfs {
            iVersion: 3,
            szOsFile: std::mem::size_of::<RawFile>() as c_int,
            mxPathname: max_pathname as c_int,
            pNext: ptr::null_mut(),
            zName: name.as_ptr(),
            pAppData: default_vfs as *mut c_void,
            xOpen: Some(vfs_open),
            xDelete: Some(path::vfs_delete),
            xAccess: Some(path::vfs_access),
            xFullPathname: Some(path::vfs_full_pathname),
            xDlOpen: Some(env::vfs_dlopen),
            xDlError: Some(env::vfs_dlerror),
            xDlSym: Some(env::vfs_dlsym),
            xDlClose: Some(env::vfs_dlclose),
            xRandomness: Some(env::vfs_randomness),
            xSleep: Some(env::vfs_sleep),
            xCurrentTime: Some(env::vfs_current_time),
            xGetLastError: Some(env::vfs_get_last_error),
            xCurrentTimeInt64: Some(env::vfs_current_time_int64),
            xSetSystemCall: None,
            xGetSystemCall: None,
            xNextSystemCall: None,
        };

        VfsDescriptor {
            base,
            name,
            vfs,
            open_files: Arc::new(AtomicUsize::new(0)),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Recover the descriptor from the pointer SQLite hands to callbacks
    ///
    /// # Safety
    ///
    /// `vfs` must be null or point at the `base` of a descriptor created by
    /// this module (descriptors are never freed once registered).
    pub(crate) unsafe fn from_raw<'a>(vfs: *mut ffi::sqlite3_vfs) -> Option<&'a VfsDescriptor> {
        (vfs as *const VfsDescriptor).as_ref()
    }

    pub(crate) fn name(&self) -> &str {
        // Built from a validated UTF-8 name
        self.name.to_str().unwrap_or_default()
    }

    pub(crate) fn vfs(&self) -> &HostVfs {
        &self.vfs
    }

    pub(crate) fn host(&self) -> Arc<dyn HostFileSystem> {
        self.vfs.host()
    }

    /// Platform default VFS captured at registration, if there was one
    pub(crate) fn default_vfs(&self) -> Option<&ffi::sqlite3_vfs> {
        // SAFETY: SQLite's built-in VFS records live for the whole process
        unsafe { (self.base.pAppData as *const ffi::sqlite3_vfs).as_ref() }
    }

    pub(crate) fn open_file_token(&self) -> UsageToken {
        UsageToken::new(&self.open_files)
    }

    fn connection_token(&self) -> UsageToken {
        UsageToken::new(&self.connections)
    }

    fn open_files(&self) -> usize {
        self.open_files.load(Ordering::Acquire)
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    fn as_raw(&mut self) -> *mut ffi::sqlite3_vfs {
        &mut self.base
    }
}

/// Registration state owned by this process
struct Registry {
    /// Record currently linked into SQLite's list
    active: Option<Box<VfsDescriptor>>,
    /// Unlinked records, kept alive for stale `sqlite3_vfs` pointers
    retired: Vec<Box<VfsDescriptor>>,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    active: None,
    retired: Vec::new(),
});

/// Register the adapter over the local filesystem with default settings
///
/// Returns the registered VFS name. Calling it again, from any thread, is a
/// no-op that returns the same name.
pub fn ensure_registered() -> Result<String> {
    ensure_registered_with(Arc::new(StdFileSystem), &VfsConfig::default())
}

/// Register the adapter over `host`
///
/// Idempotent: once a registration exists, later calls return its name and
/// ignore their arguments.
///
/// # Errors
///
/// - `InvalidConfig` if `config` fails validation
/// - `NameTaken` if another VFS already uses the configured name
/// - `RegistrationFailed` if SQLite rejects the record
pub fn ensure_registered_with(host: Arc<dyn HostFileSystem>, config: &VfsConfig) -> Result<String> {
    let mut registry = REGISTRY.lock();
    let descriptor = register_locked(&mut registry, host, config)?;
    Ok(descriptor.name().to_string())
}

/// Register with defaults if needed and count one more connection
///
/// The count and the registration are taken under the same lock, so a
/// concurrent `teardown` either finishes first or sees the connection.
pub(crate) fn retain_default() -> Result<(String, UsageToken)> {
    let mut registry = REGISTRY.lock();
    let descriptor = register_locked(&mut registry, Arc::new(StdFileSystem), &VfsConfig::default())?;
    Ok((descriptor.name().to_string(), descriptor.connection_token()))
}

fn register_locked<'a>(
    registry: &'a mut Registry,
    host: Arc<dyn HostFileSystem>,
    config: &VfsConfig,
) -> Result<&'a VfsDescriptor> {
    if registry.active.is_none() {
        registry.active = Some(build_and_register(host, config)?);
    } else if let Some(descriptor) = registry.active.as_ref() {
        if descriptor.name() != config.name {
            debug!(
                "VFS already registered as '{}', ignoring request for '{}'",
                descriptor.name(),
                config.name
            );
        }
    }

    registry
        .active
        .as_deref()
        .ok_or_else(|| VfsError::InvalidConfig("registration vanished".to_string()))
}

fn build_and_register(host: Arc<dyn HostFileSystem>, config: &VfsConfig) -> Result<Box<VfsDescriptor>> {
    config.validate()?;
    let name = CString::new(config.name.as_str())
        .map_err(|e| VfsError::InvalidConfig(format!("name: {}", e)))?;

    // SAFETY: both lookups only read SQLite's VFS list
    let (existing, default_vfs) = unsafe {
        (
            ffi::sqlite3_vfs_find(name.as_ptr()),
            ffi::sqlite3_vfs_find(ptr::null()),
        )
    };
    if !existing.is_null() {
        return Err(VfsError::NameTaken(config.name.clone()));
    }
    if default_vfs.is_null() {
        warn!("No default VFS available, using built-in randomness and clock");
    }

    let mut descriptor = Box::new(VfsDescriptor::new(
        name,
        HostVfs::new(host),
        config.max_pathname,
        default_vfs,
    ));

    // SAFETY: the boxed descriptor is never freed after this point
    let rc = unsafe { ffi::sqlite3_vfs_register(descriptor.as_raw(), config.make_default as c_int) };
    if rc != ffi::SQLITE_OK {
        return Err(VfsError::RegistrationFailed(rc));
    }

    info!(
        "Registered VFS '{}' (max_pathname: {}, default: {})",
        descriptor.name(),
        config.max_pathname,
        config.make_default
    );
    Ok(descriptor)
}

/// Unregister the adapter
///
/// A no-op when nothing is registered. The record is unlinked from SQLite
/// and retired; a later registration builds a fresh one.
///
/// # Errors
///
/// Returns `InUse` while any file opened through the VFS is still open or
/// any connection from [`open_database`](crate::open_database) is alive.
pub fn teardown() -> Result<()> {
    let mut registry = REGISTRY.lock();

    let descriptor = match registry.active.as_mut() {
        Some(d) => d,
        None => return Ok(()),
    };

    let open_files = descriptor.open_files();
    let connections = descriptor.connections();
    if open_files > 0 || connections > 0 {
        return Err(VfsError::InUse {
            name: descriptor.name().to_string(),
            open_files,
            connections,
        });
    }

    // SAFETY: the active record is linked into SQLite's list
    let rc = unsafe { ffi::sqlite3_vfs_unregister(descriptor.as_raw()) };
    if rc != ffi::SQLITE_OK {
        return Err(VfsError::UnregistrationFailed(rc));
    }

    info!("Unregistered VFS '{}'", descriptor.name());
    if let Some(retired) = registry.active.take() {
        registry.retired.push(retired);
    }
    Ok(())
}

/// Whether the adapter is currently registered
pub fn is_registered() -> bool {
    REGISTRY.lock().active.is_some()
}

/// Name the adapter is registered under
pub fn registered_name() -> Option<String> {
    REGISTRY.lock().active.as_ref().map(|d| d.name().to_string())
}

/// Files currently open through the registered VFS
pub fn open_file_count() -> usize {
    REGISTRY.lock().active.as_ref().map_or(0, |d| d.open_files())
}

/// Connections from [`open_database`](crate::open_database) still alive
pub fn connection_count() -> usize {
    REGISTRY.lock().active.as_ref().map_or(0, |d| d.connections())
}

/// Names of every VFS SQLite currently knows, default first
pub fn registered_vfs_names() -> Vec<String> {
    let mut names = Vec::new();
    // SAFETY: walks SQLite's list; this module never frees its records and
    // SQLite's built-in records are static
    unsafe {
        let mut vfs = ffi::sqlite3_vfs_find(ptr::null());
        while !vfs.is_null() {
            let name: *const c_char = (*vfs).zName;
            if !name.is_null() {
                names.push(CStr::from_ptr(name).to_string_lossy().into_owned());
            }
            vfs = (*vfs).pNext;
        }
    }
    names
}

unsafe extern "C" fn vfs_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    file::file_open(vfs, z_name, file, flags, p_out_flags)
}
