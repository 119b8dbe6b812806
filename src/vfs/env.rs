//! Environment services: randomness, clocks, sleep and dynamic loading
//!
//! Randomness and time come from the platform default VFS captured at
//! registration. When there was none, `rand` and `chrono` stand in.
//! Extension loading is not supported.

use super::registry::VfsDescriptor;
use chrono::Utc;
use libsqlite3_sys as ffi;
use rand::RngCore;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::slice;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Message handed back by `xDlError`
pub const DL_UNSUPPORTED: &str = "dlopen not supported";

/// Julian day number of the Unix epoch
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

/// Milliseconds from the Julian epoch to the Unix epoch
const UNIX_EPOCH_JULIAN_MS: i64 = 210_866_760_000_000;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Fill `buf` from the thread RNG
pub fn fill_random(buf: &mut [u8]) -> usize {
    rand::thread_rng().fill_bytes(buf);
    buf.len()
}

/// Current time as milliseconds since the Julian epoch
pub fn julian_millis() -> i64 {
    UNIX_EPOCH_JULIAN_MS + Utc::now().timestamp_millis()
}

/// Current time as a fractional Julian day number
pub fn julian_day() -> f64 {
    UNIX_EPOCH_JULIAN_DAY + Utc::now().timestamp_millis() as f64 / MS_PER_DAY
}

/// Sleep for `micros` microseconds and report the time slept
pub fn sleep_micros(micros: c_int) -> c_int {
    if micros <= 0 {
        return 0;
    }
    thread::sleep(Duration::from_micros(micros as u64));
    micros
}

/// Copy as much of `message` as fits into `out`, always NUL terminated
pub fn write_message(message: &str, out: &mut [u8]) {
    if out.is_empty() {
        return;
    }
    let n = message.len().min(out.len() - 1);
    out[..n].copy_from_slice(&message.as_bytes()[..n]);
    out[n] = 0;
}

unsafe fn default_vfs<'a>(vfs: *mut ffi::sqlite3_vfs) -> Option<&'a ffi::sqlite3_vfs> {
    VfsDescriptor::from_raw(vfs).and_then(|d| d.default_vfs())
}

fn as_mut_ptr(vfs: &ffi::sqlite3_vfs) -> *mut ffi::sqlite3_vfs {
    vfs as *const ffi::sqlite3_vfs as *mut ffi::sqlite3_vfs
}

pub(crate) unsafe extern "C" fn vfs_randomness(
    vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    z_out: *mut c_char,
) -> c_int {
    if z_out.is_null() || n_byte <= 0 {
        return 0;
    }
    if let Some(default) = default_vfs(vfs) {
        if let Some(randomness) = default.xRandomness {
            return randomness(as_mut_ptr(default), n_byte, z_out);
        }
    }
    fill_random(slice::from_raw_parts_mut(z_out as *mut u8, n_byte as usize)) as c_int
}

pub(crate) unsafe extern "C" fn vfs_sleep(_vfs: *mut ffi::sqlite3_vfs, microseconds: c_int) -> c_int {
    sleep_micros(microseconds)
}

pub(crate) unsafe extern "C" fn vfs_current_time(vfs: *mut ffi::sqlite3_vfs, p_time: *mut f64) -> c_int {
    if p_time.is_null() {
        return ffi::SQLITE_ERROR;
    }
    if let Some(default) = default_vfs(vfs) {
        if let Some(current_time) = default.xCurrentTime {
            return current_time(as_mut_ptr(default), p_time);
        }
    }
    *p_time = julian_day();
    ffi::SQLITE_OK
}

pub(crate) unsafe extern "C" fn vfs_current_time_int64(
    vfs: *mut ffi::sqlite3_vfs,
    p_time: *mut ffi::sqlite3_int64,
) -> c_int {
    if p_time.is_null() {
        return ffi::SQLITE_ERROR;
    }
    if let Some(default) = default_vfs(vfs) {
        if default.iVersion >= 2 {
            if let Some(current_time) = default.xCurrentTimeInt64 {
                return current_time(as_mut_ptr(default), p_time);
            }
        }
    }
    *p_time = julian_millis();
    ffi::SQLITE_OK
}

pub(crate) unsafe extern "C" fn vfs_get_last_error(
    _vfs: *mut ffi::sqlite3_vfs,
    _n_byte: c_int,
    _z_err_msg: *mut c_char,
) -> c_int {
    ffi::SQLITE_OK
}

// Dynamic loading is not available through this VFS

pub(crate) unsafe extern "C" fn vfs_dlopen(
    _vfs: *mut ffi::sqlite3_vfs,
    z_filename: *const c_char,
) -> *mut c_void {
    if !z_filename.is_null() {
        trace!("refusing dlopen");
    }
    ptr::null_mut()
}

pub(crate) unsafe extern "C" fn vfs_dlerror(
    _vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    z_err_msg: *mut c_char,
) {
    if z_err_msg.is_null() || n_byte <= 0 {
        return;
    }
    let out = slice::from_raw_parts_mut(z_err_msg as *mut u8, n_byte as usize);
    write_message(DL_UNSUPPORTED, out);
}

// The bindings type the symbol as a three-argument function pointer
pub(crate) unsafe extern "C" fn vfs_dlsym(
    _vfs: *mut ffi::sqlite3_vfs,
    _handle: *mut c_void,
    _z_symbol: *const c_char,
) -> Option<unsafe extern "C" fn(*mut ffi::sqlite3_vfs, *mut c_void, *const c_char)> {
    None
}

pub(crate) unsafe extern "C" fn vfs_dlclose(_vfs: *mut ffi::sqlite3_vfs, _handle: *mut c_void) {}
