//! `std::fs` backed host

use super::{HostDirectory, HostFile, HostFileSystem, OpenMode};
use crate::error::{HostError, HostResult};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Host backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl StdFileSystem {
    pub fn new() -> Self {
        StdFileSystem
    }
}

impl HostFileSystem for StdFileSystem {
    fn open(&self, path: &str, mode: OpenMode) -> HostResult<Box<dyn HostFile>> {
        let mut options = OpenOptions::new();
        options.read(true);
        match mode {
            OpenMode::Read => {}
            OpenMode::ReadWrite => {
                options.write(true);
            }
            OpenMode::ReadWriteCreate => {
                options.write(true).create(true);
            }
        }

        let file = options.open(path)?;
        trace!("std host opened {} ({:?})", path, mode);
        Ok(Box::new(StdFile {
            file: Some(file),
            position: 0,
            writable: mode.is_writable(),
        }))
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn open_dir(&self, path: &str) -> HostResult<Box<dyn HostDirectory>> {
        let root = if path.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(path)
        };

        if !root.is_dir() {
            return Err(HostError::NotFound(root.display().to_string()));
        }
        Ok(Box::new(StdDirectory { root }))
    }
}

/// Open local file with an explicit cursor
pub struct StdFile {
    file: Option<File>,
    position: u64,
    writable: bool,
}

impl StdFile {
    fn file(&mut self) -> HostResult<&mut File> {
        self.file.as_mut().ok_or(HostError::Closed)
    }
}

impl HostFile for StdFile {
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn seek(&mut self, position: u64) -> HostResult<()> {
        self.file()?.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn get_buffer(&mut self, buf: &mut [u8]) -> HostResult<usize> {
        let file = self.file()?;
        let mut total = 0;
        let result: HostResult<()> = loop {
            if total == buf.len() {
                break Ok(());
            }
            match file.read(&mut buf[total..]) {
                Ok(0) => break Ok(()),
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e.into()),
            }
        };
        self.position += total as u64;
        result.map(|_| total)
    }

    fn store_buffer(&mut self, buf: &[u8]) -> HostResult<()> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }
        let file = self.file()?;
        let mut total = 0;
        let result: HostResult<()> = loop {
            if total == buf.len() {
                break Ok(());
            }
            match file.write(&buf[total..]) {
                Ok(0) => break Err(HostError::Failed("write returned zero bytes".to_string())),
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e.into()),
            }
        };
        self.position += total as u64;
        result
    }

    fn resize(&mut self, len: u64) -> HostResult<()> {
        if !self.writable {
            return Err(HostError::ReadOnly);
        }
        self.file()?.set_len(len)?;
        Ok(())
    }

    fn flush(&mut self) -> HostResult<()> {
        let writable = self.writable;
        let file = self.file()?;
        file.flush()?;
        if writable {
            file.sync_data()?;
        }
        Ok(())
    }

    fn length(&self) -> HostResult<u64> {
        let file = self.file.as_ref().ok_or(HostError::Closed)?;
        Ok(file.metadata()?.len())
    }

    fn close(&mut self) {
        self.file = None;
    }
}

/// Local directory handle
pub struct StdDirectory {
    root: PathBuf,
}

impl HostDirectory for StdDirectory {
    fn remove(&mut self, path: &str) -> HostResult<()> {
        let target = Path::new(path);
        let target = if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.root.join(target.file_name().unwrap_or(target.as_os_str()))
        };
        fs::remove_file(&target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_create_write_read() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir, "data.bin");
        let fs = StdFileSystem::new();

        assert!(!fs.exists(&path));
        let mut file = fs.open(&path, OpenMode::ReadWriteCreate).unwrap();
        assert!(fs.exists(&path));

        file.seek(10).unwrap();
        file.store_buffer(b"hello").unwrap();
        assert_eq!(file.position(), 15);
        assert_eq!(file.length().unwrap(), 15);

        let mut buf = [0xFFu8; 15];
        file.seek(0).unwrap();
        assert_eq!(file.get_buffer(&mut buf).unwrap(), 15);
        assert_eq!(&buf[..10], &[0u8; 10]);
        assert_eq!(&buf[10..], b"hello");
    }

    #[test]
    fn test_read_past_end_is_short() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir, "short.bin");
        let fs = StdFileSystem::new();

        let mut file = fs.open(&path, OpenMode::ReadWriteCreate).unwrap();
        file.store_buffer(b"abc").unwrap();
        file.seek(1).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(file.get_buffer(&mut buf).unwrap(), 2);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir, "ro.bin");
        let fs = StdFileSystem::new();
        fs.open(&path, OpenMode::ReadWriteCreate).unwrap();

        let mut file = fs.open(&path, OpenMode::Read).unwrap();
        assert!(matches!(file.store_buffer(b"x"), Err(HostError::ReadOnly)));
        assert!(matches!(file.resize(0), Err(HostError::ReadOnly)));
    }

    #[test]
    fn test_open_missing_without_create() {
        let dir = TempDir::new().unwrap();
        let fs = StdFileSystem::new();
        let err = fs
            .open(&path_in(&dir, "missing.db"), OpenMode::ReadWrite)
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_close_marks_closed() {
        let dir = TempDir::new().unwrap();
        let fs = StdFileSystem::new();
        let mut file = fs
            .open(&path_in(&dir, "c.bin"), OpenMode::ReadWriteCreate)
            .unwrap();
        file.close();
        assert!(!file.is_open());
        assert!(matches!(file.seek(0), Err(HostError::Closed)));
    }

    #[test]
    fn test_directory_remove() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir, "gone.bin");
        let fs = StdFileSystem::new();
        fs.open(&path, OpenMode::ReadWriteCreate).unwrap();

        let mut handle = fs.open_dir(&dir.path().to_string_lossy()).unwrap();
        handle.remove(&path).unwrap();
        assert!(!fs.exists(&path));
        assert!(handle.remove(&path).unwrap_err().is_not_found());
    }
}
