//! File generator and its content pipeline.
//!
//! A [`File`] owns an ordered list of [`FileGenerator`] steps. Running it
//! captures the file's original bytes, runs each step against the resolved
//! path, and reports whether the file was created, left identical or
//! overwritten.

use std::cell::RefCell;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::constants::{EXECUTABLE_MODE, READ_ONLY_MODE};
use crate::context::OutputContext;
use crate::error::{StencilError, StencilResult};
use crate::formatter::{CommandFormatter, Formatter};
use crate::generator::Generator;
use crate::renderer::TemplateRenderer;
use crate::report::Category;
use crate::vars::Vars;

/// One step of a file's content pipeline.
pub trait FileGenerator {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()>;
}

/// Generates a single file by running its steps in order.
pub struct File {
    name: String,
    steps: Vec<Box<dyn FileGenerator>>,
}

impl File {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with<F: FileGenerator + 'static>(mut self, step: F) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captures the original bytes, prepares the parent directory and runs
    /// every step against `path`.
    fn run_steps(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<Option<Vec<u8>>> {
        let original = ctx.read(path)?;
        if !Path::new(&self.name).is_absolute() {
            ctx.ensure_parent(path)?;
        }
        for step in &self.steps {
            step.generate(ctx, path)?;
        }
        Ok(original)
    }
}

impl Generator for File {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        let path = ctx.file(&self.name);

        // Nothing requested: leave the target alone.
        if self.steps.is_empty() {
            return ctx.report(Category::Identical, &path);
        }

        let original = match self.run_steps(ctx, &path) {
            Ok(original) => original,
            Err(e) => {
                let category = match e {
                    StencilError::ConflictError { .. } => Category::Conflict,
                    _ => Category::Error,
                };
                ctx.report(category, &path)?;
                return Err(e);
            }
        };

        let created = original.is_none();
        ctx.report_change(original.as_deref().unwrap_or_default(), &path, created)
    }
}

/// Literal file body.
pub struct Contents {
    body: Body,
}

enum Body {
    Text(String),
    Bytes(Vec<u8>),
    Reader(RefCell<ReaderBody>),
    Value(Value),
}

/// A stream is drained once and its bytes reused on later runs.
enum ReaderBody {
    Pending(Box<dyn Read>),
    Drained(Vec<u8>),
}

impl Contents {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            body: Body::Text(text.into()),
        }
    }

    pub fn bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self {
            body: Body::Bytes(bytes.into()),
        }
    }

    /// Uses everything the reader yields as the body.
    pub fn reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            body: Body::Reader(RefCell::new(ReaderBody::Pending(Box::new(reader)))),
        }
    }

    /// Writes `value` as indented JSON.
    pub fn value(value: Value) -> Self {
        Self {
            body: Body::Value(value),
        }
    }

    /// Writes any serializable value as indented JSON.
    pub fn json<T: Serialize>(value: &T) -> StencilResult<Self> {
        Ok(Self::value(serde_json::to_value(value)?))
    }

    fn render(&self) -> StencilResult<Vec<u8>> {
        match &self.body {
            Body::Text(text) => Ok(text.as_bytes().to_vec()),
            Body::Bytes(bytes) => Ok(bytes.clone()),
            Body::Reader(cell) => {
                let mut state = cell.borrow_mut();
                if let ReaderBody::Pending(reader) = &mut *state {
                    let mut buf = Vec::new();
                    reader.read_to_end(&mut buf)?;
                    *state = ReaderBody::Drained(buf);
                }
                match &*state {
                    ReaderBody::Drained(buf) => Ok(buf.clone()),
                    ReaderBody::Pending(_) => Ok(Vec::new()),
                }
            }
            Body::Value(value) => Ok(serde_json::to_vec_pretty(value)?),
        }
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Contents {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Self::bytes(bytes)
    }
}

impl From<&[u8]> for Contents {
    fn from(bytes: &[u8]) -> Self {
        Self::bytes(bytes)
    }
}

impl From<Value> for Contents {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl FileGenerator for Contents {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        let bytes = self.render()?;
        ctx.write(path, &bytes)
    }
}

/// Renders a template body against every binding accumulated so far.
pub struct Template {
    source: String,
    extra: Vars,
    renderer: Option<Box<dyn TemplateRenderer>>,
}

impl Template {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
            extra: Vars::new(),
            renderer: None,
        }
    }

    /// Template with extra bindings given as `name, value, ...`.
    ///
    /// # Errors
    /// * `StencilError::MisuseError` if `pairs` has an odd length
    pub fn with_pairs<S: Into<String>>(source: S, pairs: &[Value]) -> StencilResult<Self> {
        let mut template = Self::new(source);
        template.extra = Vars::from_pairs(pairs)?;
        Ok(template)
    }

    /// Adds a binding applied to the context just before rendering.
    pub fn bind<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.extra.insert(name, value);
        self
    }

    /// Renders with `renderer` instead of the context's engine.
    pub fn with_renderer<R: TemplateRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }
}

impl FileGenerator for Template {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        ctx.vars_mut().merge(&self.extra);
        let rendered = match &self.renderer {
            Some(renderer) => renderer.render(&self.source, ctx.vars())?,
            None => ctx.renderer().render(&self.source, ctx.vars())?,
        };
        ctx.write(path, rendered.as_bytes())
    }
}

/// Re-reads the file and rewrites it through a formatter.
pub struct Format {
    formatter: Box<dyn Formatter>,
}

impl Format {
    pub fn new<F: Formatter + 'static>(formatter: F) -> Self {
        Self {
            formatter: Box::new(formatter),
        }
    }

    pub fn rustfmt() -> Self {
        Self::new(CommandFormatter::rustfmt())
    }
}

impl FileGenerator for Format {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        let source = ctx.read(path)?.unwrap_or_default();
        let formatted = self.formatter.format(&source)?;
        ctx.write(path, &formatted)
    }
}

/// Creates an empty file, or bumps the times of an existing one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Touch;

impl FileGenerator for Touch {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        if ctx.path_exists(path) {
            let now = SystemTime::now();
            debug!("Touching {}", path.display());
            ctx.chtimes(path, now, now)
        } else {
            ctx.write(path, b"")
        }
    }
}

/// Sets permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(pub u32);

impl Mode {
    pub fn read_only() -> Self {
        Self(READ_ONLY_MODE)
    }

    pub fn executable() -> Self {
        Self(EXECUTABLE_MODE)
    }
}

impl FileGenerator for Mode {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        ctx.chmod(path, self.0)
    }
}

/// Sets the owning user and group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chown {
    pub uid: u32,
    pub gid: u32,
}

impl FileGenerator for Chown {
    fn generate(&self, ctx: &mut OutputContext, path: &Path) -> StencilResult<()> {
        ctx.chown(path, self.uid, self.gid)
    }
}
