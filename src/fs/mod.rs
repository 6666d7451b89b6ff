//! Filesystem capability consumed by the execution context.
//!
//! Generators never call `std::fs` directly: every read, write and metadata
//! change goes through a [`Filesystem`], so the same tree can run against
//! the real disk ([`OsFs`]) or an in-memory tree ([`MemFs`]).

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::SystemTime;

mod memory;
mod os;

pub use memory::MemFs;
pub use os::OsFs;

/// Subset of file metadata the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub len: u64,
    pub mode: u32,
    pub modified: Option<SystemTime>,
}

/// How [`Filesystem::open_file`] opens its target for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file if needed and discard existing contents
    Truncate,
    /// Create the file if needed and write after existing contents
    Append,
    /// Fail with `AlreadyExists` if the file is present
    CreateNew,
}

/// POSIX-like file operations.
///
/// Implementations must report a missing path with
/// `io::ErrorKind::NotFound` so callers can tell absence apart from other
/// failures.
pub trait Filesystem {
    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;

    fn open_file(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn Write>>;

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    fn remove_all(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn chtimes(&self, path: &Path, atime: SystemTime, mtime: SystemTime) -> io::Result<()>;

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        self.open_file(path, OpenMode::Truncate)
    }

    /// Reads the whole file into memory.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
