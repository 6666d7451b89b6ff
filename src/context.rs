//! Per-run execution context.
//!
//! The context owns everything a generator tree needs while it runs: the
//! variable bindings, the working-directory stack, the filesystem, the
//! template renderer, the overwrite/dry-run flags and the change reporter.
//! It is not shared between runs and is not meant to be used from more than
//! one thread.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};

use crate::constants::DIR_MODE;
use crate::error::{StencilError, StencilResult};
use crate::fs::{FileInfo, Filesystem};
use crate::generator::Generator;
use crate::renderer::{has_template_markup, MiniJinjaRenderer, TemplateRenderer};
use crate::report::{Category, Reporter};
use crate::vars::Vars;

pub struct OutputContext {
    vars: Vars,
    dirs: Vec<String>,
    fs: Box<dyn Filesystem>,
    renderer: Box<dyn TemplateRenderer>,
    reporter: Reporter,
    overwrite: bool,
    dry_run: bool,
    /// Bytes content steps would have written during a dry run.
    staged: HashMap<PathBuf, Vec<u8>>,
    /// Paths whose bytes this run created or changed; exempt from the
    /// overwrite guard.
    changed: HashSet<PathBuf>,
}

impl OutputContext {
    /// Creates a context rooted at `work_dir`, reporting to stdout.
    pub fn new<F, P>(fs: F, work_dir: P) -> Self
    where
        F: Filesystem + 'static,
        P: AsRef<Path>,
    {
        let root = work_dir.as_ref().to_string_lossy().into_owned();
        let root = if root.is_empty() { ".".to_string() } else { root };
        Self {
            vars: Vars::new(),
            dirs: vec![root],
            fs: Box::new(fs),
            renderer: Box::new(MiniJinjaRenderer::new()),
            reporter: Reporter::stdout(),
            overwrite: false,
            dry_run: false,
            staged: HashMap::new(),
            changed: HashSet::new(),
        }
    }

    pub fn with_renderer<R: TemplateRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.vars.merge(&vars);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    pub fn renderer(&self) -> &dyn TemplateRenderer {
        self.renderer.as_ref()
    }

    /// Runs a generator tree against this context.
    pub fn run(&mut self, generator: &dyn Generator) -> StencilResult<()> {
        generator.generate(self)
    }

    /// The cleaned join of the directory stack.
    pub fn work_dir(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for dir in &self.dirs {
            path.push(dir);
        }
        clean_path(&path)
    }

    /// Pushes one (name-expanded) segment onto the directory stack.
    pub fn push_dir(&mut self, segment: &str) {
        let segment = self.expand(segment);
        debug!("Entering directory {}", segment);
        self.dirs.push(segment);
    }

    /// Pops the innermost segment.
    ///
    /// # Errors
    /// * `StencilError::DirStackError` if only the root segment remains
    pub fn pop_dir(&mut self) -> StencilResult<()> {
        if self.dirs.len() <= 1 {
            return Err(StencilError::DirStackError("cannot pop dir".to_string()));
        }
        if let Some(segment) = self.dirs.pop() {
            debug!("Leaving directory {}", segment);
        }
        Ok(())
    }

    pub fn dir_depth(&self) -> usize {
        self.dirs.len()
    }

    /// Pushes `segment` and returns a guard that pops it when dropped.
    pub fn scope(&mut self, segment: &str) -> DirScope<'_> {
        self.push_dir(segment);
        DirScope { ctx: self }
    }

    /// Runs `f` with `segment` pushed; the segment is popped whether or not
    /// `f` succeeds.
    pub fn with_dir<T, F>(&mut self, segment: &str, f: F) -> StencilResult<T>
    where
        F: FnOnce(&mut OutputContext) -> StencilResult<T>,
    {
        let mut scope = self.scope(segment);
        f(&mut *scope)
    }

    /// Expands template markup in `name` against the current bindings.
    ///
    /// A name that fails to render is used literally.
    pub fn expand(&self, name: &str) -> String {
        if !has_template_markup(name) {
            return name.to_string();
        }
        match self.renderer.render(name, &self.vars) {
            Ok(expanded) => expanded,
            Err(e) => {
                warn!("Using name {:?} unexpanded: {}", name, e);
                name.to_string()
            }
        }
    }

    /// Resolves a logical file name to a concrete path.
    ///
    /// Absolute names pass through untouched; relative names are expanded
    /// and joined onto the working directory.
    pub fn file(&self, name: &str) -> PathBuf {
        if Path::new(name).is_absolute() {
            return PathBuf::from(name);
        }
        clean_path(&self.work_dir().join(self.expand(name)))
    }

    /// True unless stat fails with "not found".
    pub fn exists(&self, name: &str) -> bool {
        self.path_exists(&self.file(name))
    }

    pub fn path_exists(&self, path: &Path) -> bool {
        if self.staged.contains_key(path) {
            return true;
        }
        match self.fs.stat(path) {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::NotFound,
        }
    }

    pub fn stat(&self, path: &Path) -> StencilResult<FileInfo> {
        Ok(self.fs.stat(path)?)
    }

    /// Resolves `name` and makes sure its parent directories exist.
    pub fn ensure_path(&mut self, name: &str) -> StencilResult<PathBuf> {
        let path = self.file(name);
        if !Path::new(name).is_absolute() {
            self.ensure_parent(&path)?;
        }
        Ok(path)
    }

    /// Creates the parent directories of a resolved path. Does nothing during
    /// a dry run.
    pub fn ensure_parent(&self, path: &Path) -> StencilResult<()> {
        if self.dry_run {
            return Ok(());
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                Ok(self.fs.mkdir_all(parent, DIR_MODE)?)
            }
            _ => Ok(()),
        }
    }

    /// Reads a file's current bytes, including content staged by a dry run.
    ///
    /// Returns `None` when the file does not exist.
    pub fn read(&self, path: &Path) -> StencilResult<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.get(path) {
            return Ok(Some(staged.clone()));
        }
        match self.fs.read(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StencilError::IoError(e)),
        }
    }

    /// Replaces a file's contents.
    ///
    /// During a dry run the bytes are staged instead of written.
    ///
    /// # Errors
    /// * `StencilError::ConflictError` if overwriting is disabled and the
    ///   file already holds different bytes that this run did not create or
    ///   change
    pub fn write(&mut self, path: &Path, contents: &[u8]) -> StencilResult<()> {
        if let Some(existing) = self.read(path)? {
            if existing == contents {
                debug!("{} already up to date", path.display());
                return Ok(());
            }
            if !self.overwrite && !self.changed.contains(path) {
                return Err(StencilError::ConflictError {
                    path: path.to_path_buf(),
                });
            }
        }
        self.changed.insert(path.to_path_buf());

        if self.dry_run {
            debug!("Dry run: not writing {}", path.display());
            self.staged.insert(path.to_path_buf(), contents.to_vec());
            return Ok(());
        }

        self.ensure_parent(path)?;
        let mut file = self.fs.create(path)?;
        file.write_all(contents)?;
        file.flush()?;
        Ok(())
    }

    /// Opens a file for ad hoc output. During a dry run the writer discards
    /// everything.
    pub fn create(&mut self, path: &Path) -> StencilResult<Box<dyn Write>> {
        if self.dry_run {
            debug!("Dry run: not creating {}", path.display());
            return Ok(Box::new(io::sink()));
        }
        self.ensure_parent(path)?;
        self.changed.insert(path.to_path_buf());
        Ok(self.fs.create(path)?)
    }

    pub fn chmod(&mut self, path: &Path, mode: u32) -> StencilResult<()> {
        if self.dry_run {
            debug!("Dry run: not changing mode of {} to {:o}", path.display(), mode);
            return Ok(());
        }
        self.ensure_parent(path)?;
        Ok(self.fs.chmod(path, mode)?)
    }

    pub fn chown(&mut self, path: &Path, uid: u32, gid: u32) -> StencilResult<()> {
        if self.dry_run {
            debug!("Dry run: not changing owner of {}", path.display());
            return Ok(());
        }
        self.ensure_parent(path)?;
        Ok(self.fs.chown(path, uid, gid)?)
    }

    pub fn rename(&mut self, from: &Path, to: &Path) -> StencilResult<()> {
        if self.dry_run {
            debug!("Dry run: not renaming {} to {}", from.display(), to.display());
            return Ok(());
        }
        self.ensure_parent(to)?;
        Ok(self.fs.rename(from, to)?)
    }

    pub fn chtimes(&mut self, path: &Path, atime: SystemTime, mtime: SystemTime) -> StencilResult<()> {
        if self.dry_run {
            debug!("Dry run: not touching {}", path.display());
            return Ok(());
        }
        self.ensure_parent(path)?;
        Ok(self.fs.chtimes(path, atime, mtime)?)
    }

    pub fn remove(&mut self, path: &Path) -> StencilResult<()> {
        if self.dry_run {
            debug!("Dry run: not removing {}", path.display());
            return Ok(());
        }
        Ok(self.fs.remove_all(path)?)
    }

    pub fn report(&mut self, category: Category, path: &Path) -> StencilResult<()> {
        Ok(self.reporter.report(category, path, self.dry_run)?)
    }

    /// Classifies and reports what happened to `path`.
    ///
    /// `created` files are always reported as created. Otherwise the
    /// current bytes are compared to `original`; a file that cannot be read
    /// counts as empty.
    pub fn report_change(&mut self, original: &[u8], path: &Path, created: bool) -> StencilResult<()> {
        if created {
            return self.report(Category::Create, path);
        }
        let current = self.read(path).ok().flatten().unwrap_or_default();
        if current == original {
            self.report(Category::Identical, path)
        } else {
            self.report(Category::Overwrite, path)
        }
    }
}

/// Guard returned by [`OutputContext::scope`]; pops its directory on drop.
pub struct DirScope<'a> {
    ctx: &'a mut OutputContext,
}

impl Deref for DirScope<'_> {
    type Target = OutputContext;

    fn deref(&self) -> &OutputContext {
        self.ctx
    }
}

impl DerefMut for DirScope<'_> {
    fn deref_mut(&mut self) -> &mut OutputContext {
        self.ctx
    }
}

impl Drop for DirScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.pop_dir() {
            warn!("{}", e);
        }
    }
}

/// Lexically normalizes a path: drops `.`, folds `..` into its parent.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        PathBuf::from(".")
    } else {
        parts.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;

    fn context() -> OutputContext {
        OutputContext::new(MemFs::new(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false))
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("./a/./b")), PathBuf::from("a/b"));
        assert_eq!(clean_path(Path::new("a/../b")), PathBuf::from("b"));
        assert_eq!(clean_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean_path(Path::new(".")), PathBuf::from("."));
    }

    #[test]
    fn test_pop_root_fails() {
        let mut ctx = context();
        assert!(matches!(ctx.pop_dir(), Err(StencilError::DirStackError(_))));
        assert_eq!(ctx.dir_depth(), 1);
    }

    #[test]
    fn test_push_pop_restores_work_dir() {
        let mut ctx = context();
        let before = ctx.work_dir();
        ctx.push_dir("bin");
        assert_eq!(ctx.work_dir(), PathBuf::from("bin"));
        ctx.pop_dir().unwrap();
        assert_eq!(ctx.work_dir(), before);
    }

    #[test]
    fn test_with_dir_pops_on_error() {
        let mut ctx = context();
        let result: StencilResult<()> = ctx.with_dir("src", |ctx| {
            assert_eq!(ctx.dir_depth(), 2);
            Err(StencilError::TemplateError("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(ctx.dir_depth(), 1);
    }

    #[test]
    fn test_file_resolution() {
        let mut ctx = context();
        ctx.vars_mut().insert("name", "demo");
        assert_eq!(ctx.file("{{ name }}.txt"), PathBuf::from("demo.txt"));
        assert_eq!(ctx.file("/etc/{{ name }}"), PathBuf::from("/etc/{{ name }}"));
        ctx.push_dir("{{ name }}");
        assert_eq!(ctx.file("Cargo.toml"), PathBuf::from("demo/Cargo.toml"));
    }

    #[test]
    fn test_bad_name_template_falls_back() {
        let ctx = context();
        assert_eq!(ctx.file("{{ broken"), PathBuf::from("{{ broken"));
    }

    #[test]
    fn test_ensure_path_creates_parents() {
        let fs = MemFs::new();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        let path = ctx.ensure_path("a/b/c.txt").unwrap();
        assert_eq!(path, PathBuf::from("a/b/c.txt"));
        assert!(fs.stat(Path::new("a/b")).unwrap().is_dir);
    }

    #[test]
    fn test_write_conflict_without_overwrite() {
        let fs = MemFs::new();
        fs.add_file("existing.txt", "old").unwrap();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        let path = PathBuf::from("existing.txt");
        assert!(ctx.write(&path, b"old").is_ok());
        let fresh = PathBuf::from("fresh.txt");
        ctx.write(&fresh, b"one").unwrap();
        ctx.write(&fresh, b"two").unwrap();

        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        assert!(matches!(
            ctx.write(&path, b"new"),
            Err(StencilError::ConflictError { .. })
        ));
        assert_eq!(fs.read_file("existing.txt").unwrap(), b"old");
    }

    struct DeniedFs;

    fn denied() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "permission denied")
    }

    impl Filesystem for DeniedFs {
        fn stat(&self, _path: &Path) -> io::Result<FileInfo> {
            Err(denied())
        }
        fn open(&self, _path: &Path) -> io::Result<Box<dyn io::Read>> {
            Err(denied())
        }
        fn open_file(&self, _path: &Path, _mode: crate::fs::OpenMode) -> io::Result<Box<dyn Write>> {
            Err(denied())
        }
        fn mkdir(&self, _path: &Path, _mode: u32) -> io::Result<()> {
            Err(denied())
        }
        fn mkdir_all(&self, _path: &Path, _mode: u32) -> io::Result<()> {
            Err(denied())
        }
        fn chmod(&self, _path: &Path, _mode: u32) -> io::Result<()> {
            Err(denied())
        }
        fn chown(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
            Err(denied())
        }
        fn remove(&self, _path: &Path) -> io::Result<()> {
            Err(denied())
        }
        fn remove_all(&self, _path: &Path) -> io::Result<()> {
            Err(denied())
        }
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(denied())
        }
        fn chtimes(&self, _path: &Path, _atime: SystemTime, _mtime: SystemTime) -> io::Result<()> {
            Err(denied())
        }
    }

    #[test]
    fn test_exists() {
        let fs = MemFs::new();
        fs.add_file("present.txt", "x").unwrap();
        let ctx = OutputContext::new(fs, ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        assert!(ctx.exists("present.txt"));
        assert!(!ctx.exists("absent.txt"));
    }

    #[test]
    fn test_exists_sees_staged_file() {
        let mut ctx = context().dry_run(true);
        assert!(!ctx.exists("staged.txt"));
        ctx.write(Path::new("staged.txt"), b"x").unwrap();
        assert!(ctx.exists("staged.txt"));
    }

    #[test]
    fn test_stat_error_other_than_not_found_counts_as_existing() {
        let ctx = OutputContext::new(DeniedFs, ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        assert!(ctx.exists("locked.txt"));
    }

    #[test]
    fn test_dry_run_create_rename_remove_do_nothing() {
        let fs = MemFs::new();
        fs.add_file("keep.txt", "keep").unwrap();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false))
            .dry_run(true);

        let mut out = ctx.create(Path::new("new/out.txt")).unwrap();
        out.write_all(b"discarded").unwrap();
        drop(out);
        ctx.rename(Path::new("keep.txt"), Path::new("moved.txt")).unwrap();
        ctx.remove(Path::new("keep.txt")).unwrap();

        assert_eq!(fs.paths(), vec![PathBuf::from("keep.txt")]);
        assert_eq!(fs.read_file("keep.txt").unwrap(), b"keep");
    }

    #[test]
    fn test_create_rename_remove() {
        let fs = MemFs::new();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));

        let mut out = ctx.create(Path::new("a/out.txt")).unwrap();
        out.write_all(b"body").unwrap();
        drop(out);
        assert_eq!(fs.read_file("a/out.txt").unwrap(), b"body");

        ctx.rename(Path::new("a/out.txt"), Path::new("b/moved.txt")).unwrap();
        assert_eq!(fs.read_file("b/moved.txt").unwrap(), b"body");

        ctx.remove(Path::new("b")).unwrap();
        assert_eq!(fs.paths(), vec![PathBuf::from("a")]);
    }

    #[test]
    fn test_identical_write_keeps_overwrite_guard() {
        let fs = MemFs::new();
        fs.add_file("user.txt", "a").unwrap();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false));
        let path = PathBuf::from("user.txt");

        ctx.write(&path, b"a").unwrap();
        assert!(matches!(
            ctx.write(&path, b"b"),
            Err(StencilError::ConflictError { .. })
        ));
    }

    #[test]
    fn test_dry_run_stages_writes() {
        let fs = MemFs::new();
        let mut ctx = OutputContext::new(fs.clone(), ".")
            .with_reporter(Reporter::new(Box::new(io::sink()), false))
            .dry_run(true);
        let path = ctx.ensure_path("dir/file.txt").unwrap();
        ctx.write(&path, b"staged").unwrap();
        assert_eq!(ctx.read(&path).unwrap(), Some(b"staged".to_vec()));
        assert!(ctx.path_exists(&path));
        assert!(fs.paths().is_empty());
    }
}
