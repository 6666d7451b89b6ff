//! In-memory filesystem, used for tests and for previewing a run.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use super::{FileInfo, Filesystem, OpenMode};
use crate::constants::{DIR_MODE, FILE_MODE};

/// In-memory filesystem.
///
/// Clones share the same tree, so a test can hand one clone to the context
/// and inspect the result through another.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    inner: Arc<RwLock<BTreeMap<PathBuf, Node>>>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    mode: u32,
    uid: u32,
    gid: u32,
    atime: SystemTime,
    mtime: SystemTime,
}

#[derive(Debug, Clone)]
enum NodeKind {
    File(Vec<u8>),
    Dir,
}

impl Node {
    fn file(contents: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::File(contents),
            mode: FILE_MODE,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
        }
    }

    fn dir(mode: u32) -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::Dir,
            mode,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir)
    }
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file, creating its parent directories.
    pub fn add_file<P: AsRef<Path>, C: AsRef<[u8]>>(&self, path: P, contents: C) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.mkdir_all(parent, DIR_MODE)?;
        }
        self.nodes_mut()?
            .insert(path.to_path_buf(), Node::file(contents.as_ref().to_vec()));
        Ok(())
    }

    /// Returns a file's contents, or `None` if it is missing or a directory.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Option<Vec<u8>> {
        let nodes = self.inner.read().ok()?;
        match &nodes.get(path.as_ref())?.kind {
            NodeKind::File(contents) => Some(contents.clone()),
            NodeKind::Dir => None,
        }
    }

    pub fn mode<P: AsRef<Path>>(&self, path: P) -> Option<u32> {
        let nodes = self.inner.read().ok()?;
        nodes.get(path.as_ref()).map(|node| node.mode)
    }

    pub fn owner<P: AsRef<Path>>(&self, path: P) -> Option<(u32, u32)> {
        let nodes = self.inner.read().ok()?;
        nodes.get(path.as_ref()).map(|node| (node.uid, node.gid))
    }

    pub fn accessed<P: AsRef<Path>>(&self, path: P) -> Option<SystemTime> {
        let nodes = self.inner.read().ok()?;
        nodes.get(path.as_ref()).map(|node| node.atime)
    }

    pub fn modified<P: AsRef<Path>>(&self, path: P) -> Option<SystemTime> {
        let nodes = self.inner.read().ok()?;
        nodes.get(path.as_ref()).map(|node| node.mtime)
    }

    /// Lists every file and directory, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|nodes| nodes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn nodes(&self) -> io::Result<RwLockReadGuard<'_, BTreeMap<PathBuf, Node>>> {
        self.inner.read().map_err(|_| lock_poisoned())
    }

    fn nodes_mut(&self) -> io::Result<RwLockWriteGuard<'_, BTreeMap<PathBuf, Node>>> {
        self.inner.write().map_err(|_| lock_poisoned())
    }
}

impl Filesystem for MemFs {
    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        if is_root(path) {
            return Ok(FileInfo {
                is_dir: true,
                len: 0,
                mode: DIR_MODE,
                modified: None,
            });
        }
        let nodes = self.nodes()?;
        let node = nodes.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileInfo {
            is_dir: node.is_dir(),
            len: match &node.kind {
                NodeKind::File(contents) => contents.len() as u64,
                NodeKind::Dir => 0,
            },
            mode: node.mode,
            modified: Some(node.mtime),
        })
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        let nodes = self.nodes()?;
        match &nodes.get(path).ok_or_else(|| not_found(path))?.kind {
            NodeKind::File(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
            NodeKind::Dir => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
        }
    }

    fn open_file(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn Write>> {
        let mut nodes = self.nodes_mut()?;
        check_parent(&nodes, path)?;
        match (nodes.get(path).map(Node::is_dir), mode) {
            (Some(true), _) => {
                return Err(io::Error::other(format!("{} is a directory", path.display())));
            }
            (Some(false), OpenMode::CreateNew) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ));
            }
            (Some(false), OpenMode::Truncate) => {
                if let Some(node) = nodes.get_mut(path) {
                    node.kind = NodeKind::File(Vec::new());
                    node.mtime = SystemTime::now();
                }
            }
            (Some(false), OpenMode::Append) => {}
            (None, _) => {
                nodes.insert(path.to_path_buf(), Node::file(Vec::new()));
            }
        }
        Ok(Box::new(MemWriter {
            inner: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        }))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        if is_root(path) || nodes.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        check_parent(&nodes, path)?;
        nodes.insert(path.to_path_buf(), Node::dir(mode));
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        let mut ancestors: Vec<&Path> = path.ancestors().filter(|p| !is_root(p)).collect();
        ancestors.reverse();
        for dir in ancestors {
            match nodes.get(dir) {
                Some(node) if node.is_dir() => {}
                Some(_) => {
                    return Err(io::Error::other(format!(
                        "{} is not a directory",
                        dir.display()
                    )));
                }
                None => {
                    nodes.insert(dir.to_path_buf(), Node::dir(mode));
                }
            }
        }
        Ok(())
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        let node = nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.mode = mode;
        Ok(())
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        let node = nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.uid = uid;
        node.gid = gid;
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        if !nodes.contains_key(path) {
            return Err(not_found(path));
        }
        if nodes.keys().any(|p| p != path && p.starts_with(path)) {
            return Err(io::Error::other(format!(
                "{} is not empty",
                path.display()
            )));
        }
        nodes.remove(path);
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        if !nodes.contains_key(from) {
            return Err(not_found(from));
        }
        check_parent(&nodes, to)?;
        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let suffix = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(suffix)
                };
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn chtimes(&self, path: &Path, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        let mut nodes = self.nodes_mut()?;
        let node = nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.atime = atime;
        node.mtime = mtime;
        Ok(())
    }
}

/// Writer handed out by `open_file`; every write lands in the shared tree.
struct MemWriter {
    inner: Arc<RwLock<BTreeMap<PathBuf, Node>>>,
    path: PathBuf,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut nodes = self.inner.write().map_err(|_| lock_poisoned())?;
        let node = nodes.get_mut(&self.path).ok_or_else(|| not_found(&self.path))?;
        match &mut node.kind {
            NodeKind::File(contents) => contents.extend_from_slice(buf),
            NodeKind::Dir => {
                return Err(io::Error::other(format!(
                    "{} is a directory",
                    self.path.display()
                )));
            }
        }
        node.mtime = SystemTime::now();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new("/") || path == Path::new(".")
}

fn check_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !is_root(parent) => match nodes.get(parent) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(io::Error::other(format!(
                "{} is not a directory",
                parent.display()
            ))),
            None => Err(not_found(parent)),
        },
        _ => Ok(()),
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn lock_poisoned() -> io::Error {
    io::Error::other("memory filesystem lock poisoned")
}
