//! Temp-file sinks for file-upload parts.
//!
//! File uploads stream to disk through a [`FileSink`] so the parser never
//! holds a whole upload in memory. The handle is consumed by `close`, so a
//! double close of the same upload cannot compile; the reader guarantees one
//! close per opened handle on every exit path.
//!
//! Temp paths come from a [`TempDirProvider`] passed in explicitly rather
//! than process-wide mutable configuration; each upload gets a unique
//! uuid-named file under the provider's directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Exclusive-write temp file abstraction used for file-upload parts.
///
/// Any `io::Error` from `open` or `write` is fatal for the entire parse; the
/// parser does not retry, since a partially written file is not resumable
/// mid-request.
pub trait FileSink {
    type Handle;

    fn open(&mut self, path: &Path) -> io::Result<Self::Handle>;
    fn write(&mut self, handle: &mut Self::Handle, chunk: &[u8]) -> io::Result<()>;
    fn close(&mut self, handle: Self::Handle) -> io::Result<()>;
}

/// Chooses fresh, collision-free paths for upload temp files.
#[derive(Debug, Clone)]
pub struct TempDirProvider {
    dir: PathBuf,
}

impl TempDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn fresh_path(&self) -> PathBuf {
        self.dir.join(format!("form-upload-{}", Uuid::new_v4()))
    }
}

impl Default for TempDirProvider {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// The standard-filesystem [`FileSink`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TempFileSink;

impl FileSink for TempFileSink {
    type Handle = File;

    fn open(&mut self, path: &Path) -> io::Result<Self::Handle> {
        File::create_new(path)
    }

    fn write(&mut self, handle: &mut Self::Handle, chunk: &[u8]) -> io::Result<()> {
        handle.write_all(chunk)
    }

    fn close(&mut self, handle: Self::Handle) -> io::Result<()> {
        handle.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_paths_do_not_collide() {
        let provider = TempDirProvider::default();
        assert_ne!(provider.fresh_path(), provider.fresh_path());
    }

    #[test]
    fn sink_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TempDirProvider::new(dir.path());
        let path = provider.fresh_path();

        let mut sink = TempFileSink;
        let mut handle = sink.open(&path).unwrap();
        sink.write(&mut handle, b"hello ").unwrap();
        sink.write(&mut handle, b"world").unwrap();
        sink.close(handle).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn open_refuses_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken");
        std::fs::write(&path, b"x").unwrap();

        let mut sink = TempFileSink;
        assert!(sink.open(&path).is_err());
    }
}
