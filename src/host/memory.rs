//! In-memory host with fault injection
//!
//! Files live in a shared table keyed by path. Clones of a
//! [`MemoryFileSystem`] share the table and the fault switches, so a test can
//! keep one handle while the adapter drives another.

use super::{HostDirectory, HostFile, HostFileSystem, OpenMode};
use crate::error::{HostError, HostResult};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;

type FileData = Arc<Mutex<Vec<u8>>>;

/// Failure switches consulted on every host call
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Fail every `open`
    pub fail_open: bool,
    /// Fail every `get_buffer`
    pub fail_read: bool,
    /// Persist at most this many bytes per `store_buffer`, silently
    pub short_write: Option<usize>,
    /// Fail every `resize`
    pub fail_resize: bool,
    /// Fail every `flush`
    pub fail_flush: bool,
    /// Fail every `remove` with a generic error
    pub fail_remove: bool,
}

/// Host keeping every file in process memory
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<AHashMap<String, FileData>>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active fault switches
    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock() = faults;
    }

    /// Clear all fault switches
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Copy of a file's contents, if it exists
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|data| data.lock().clone())
    }

    /// Create or replace a file
    pub fn insert(&self, path: &str, data: &[u8]) {
        self.files
            .lock()
            .insert(path.to_string(), Arc::new(Mutex::new(data.to_vec())));
    }

    /// Number of files stored
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

impl HostFileSystem for MemoryFileSystem {
    fn open(&self, path: &str, mode: OpenMode) -> HostResult<Box<dyn HostFile>> {
        if self.faults.lock().fail_open {
            return Err(HostError::Failed(format!("injected open failure: {}", path)));
        }

        let mut files = self.files.lock();
        let data = match files.get(path) {
            Some(data) => Arc::clone(data),
            None if mode == OpenMode::ReadWriteCreate => {
                let data: FileData = Arc::new(Mutex::new(Vec::new()));
                files.insert(path.to_string(), Arc::clone(&data));
                data
            }
            None => return Err(HostError::NotFound(path.to_string())),
        };

        Ok(Box::new(MemoryFile {
            data: Some(data),
            position: 0,
            writable: mode.is_writable(),
            faults: Arc::clone(&self.faults),
        }))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }

    fn open_dir(&self, _path: &str) -> HostResult<Box<dyn HostDirectory>> {
        Ok(Box::new(MemoryDirectory {
            files: Arc::clone(&self.files),
            faults: Arc::clone(&self.faults),
        }))
    }
}

/// Open in-memory file
pub struct MemoryFile {
    data: Option<FileData>,
    position: u64,
    writable: bool,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryFile {
    fn data(&self) -> HostResult<&FileData> {
        self.data.as_ref().ok_or(HostError::Closed)
    }
}

fn too_large(len: u64) -> HostError {
    HostError::Failed(format!("size {} exceeds available memory", len))
}

/// Zero-extend `data` to `len` bytes, failing instead of aborting on OOM
fn grow(data: &mut Vec<u8>, len: usize) -> HostResult<()> {
    data.try_reserve(len - data.len()).map_err(|_| too_large(len as u64))?;
    data.resize(len, 0);
    Ok(())
}

impl HostFile for MemoryFile {
    fn is_open(&self) -> bool {
        self.data.is_some()
    }

    fn seek(&mut self, position: u64) -> HostResult<()> {
        self.data()?;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn get_buffer(&mut self, buf: &mut [u8]) -> HostResult<usize> {
        if self.faults.lock().fail_read {
            return Err(HostError::Failed("injected read failure".to_string()));
        }

        let n = {
            let data = self.data()?.lock();
            let start = usize::try_from(self.position)
                .unwrap_or(usize::MAX)
                .min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            n
        };
        self.position += n as u64;
        Ok(n)
    }

    fn store_buffer(&mut self, buf: &[u8]) -> HostResult<()> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }

        let limit = self.faults.lock().short_write.unwrap_or(usize::MAX);
        let n = buf.len().min(limit);
        {
            let mut data = self.data()?.lock();
            let start = usize::try_from(self.position).map_err(|_| too_large(self.position))?;
            let end = start
                .checked_add(n)
                .ok_or_else(|| too_large(self.position))?;
            if data.len() < end {
                grow(&mut data, end)?;
            }
            data[start..end].copy_from_slice(&buf[..n]);
        }
        self.position += n as u64;
        Ok(())
    }

    fn resize(&mut self, len: u64) -> HostResult<()> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }
        if self.faults.lock().fail_resize {
            return Err(HostError::Failed("injected resize failure".to_string()));
        }
        let len = usize::try_from(len).map_err(|_| too_large(len))?;
        let mut data = self.data()?.lock();
        if data.len() < len {
            grow(&mut data, len)
        } else {
            data.truncate(len);
            Ok(())
        }
    }

    fn flush(&mut self) -> HostResult<()> {
        self.data()?;
        if self.faults.lock().fail_flush {
            return Err(HostError::Failed("injected flush failure".to_string()));
        }
        Ok(())
    }

    fn length(&self) -> HostResult<u64> {
        Ok(self.data()?.lock().len() as u64)
    }

    fn close(&mut self) {
        self.data = None;
    }
}

/// Directory view over the shared file table
pub struct MemoryDirectory {
    files: Arc<Mutex<AHashMap<String, FileData>>>,
    faults: Arc<Mutex<Faults>>,
}

impl HostDirectory for MemoryDirectory {
    fn remove(&mut self, path: &str) -> HostResult<()> {
        if self.faults.lock().fail_remove {
            return Err(HostError::Failed(format!("injected remove failure: {}", path)));
        }
        match self.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(HostError::NotFound(path.to_string())),
        }
    }
}
