//! Generator composition tree.
//!
//! A scaffold is described as a tree of [`Generator`]s: [`Sequence`] runs
//! children in order, [`Dir`] scopes children under a directory, [`Data`]
//! binds variables, and the leaves ([`File`](crate::file::File),
//! [`ExternalCommand`](crate::command::ExternalCommand)) touch the
//! filesystem. Every generator runs against the same
//! [`OutputContext`], and the first failure aborts the rest of the tree.

use log::debug;
use serde_json::Value;

use crate::context::OutputContext;
use crate::error::StencilResult;
use crate::vars::Vars;

/// A unit of the composition tree.
pub trait Generator {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()>;
}

/// An absent generator is skipped.
impl<G: Generator> Generator for Option<G> {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        match self {
            Some(generator) => generator.generate(ctx),
            None => Ok(()),
        }
    }
}

impl Generator for Box<dyn Generator> {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        self.as_ref().generate(ctx)
    }
}

/// Does nothing; a placeholder where a generator is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Generator for Noop {
    fn generate(&self, _ctx: &mut OutputContext) -> StencilResult<()> {
        Ok(())
    }
}

/// Ordered list of generators, stopping at the first failure.
#[derive(Default)]
pub struct Sequence {
    generators: Vec<Option<Box<dyn Generator>>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<G: Generator + 'static>(mut self, generator: G) -> Self {
        self.push(generator);
        self
    }

    /// Adds a generator that may be absent; `None` entries are skipped.
    pub fn with_opt<G: Generator + 'static>(mut self, generator: Option<G>) -> Self {
        self.generators
            .push(generator.map(|g| Box::new(g) as Box<dyn Generator>));
        self
    }

    pub fn push<G: Generator + 'static>(&mut self, generator: G) {
        self.generators.push(Some(Box::new(generator)));
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl FromIterator<Box<dyn Generator>> for Sequence {
    fn from_iter<I: IntoIterator<Item = Box<dyn Generator>>>(iter: I) -> Self {
        Self {
            generators: iter.into_iter().map(Some).collect(),
        }
    }
}

impl Generator for Sequence {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        for generator in self.generators.iter().flatten() {
            generator.generate(ctx)?;
        }
        Ok(())
    }
}

/// Runs its children with `name` pushed onto the working directory.
///
/// The directory is popped even when a child fails; the child's error is
/// still returned.
pub struct Dir {
    name: String,
    children: Sequence,
}

impl Dir {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            children: Sequence::new(),
        }
    }

    pub fn with<G: Generator + 'static>(mut self, generator: G) -> Self {
        self.children.push(generator);
        self
    }

    pub fn with_opt<G: Generator + 'static>(mut self, generator: Option<G>) -> Self {
        self.children = self.children.with_opt(generator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Generator for Dir {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        ctx.with_dir(&self.name, |ctx| self.children.generate(ctx))
    }
}

/// Binds variables into the context; never touches the filesystem.
#[derive(Debug, Clone, Default)]
pub struct Data {
    vars: Vars,
}

impl Data {
    /// Binds a single name.
    pub fn new<K: Into<String>, V: Into<Value>>(name: K, value: V) -> Self {
        let mut vars = Vars::new();
        vars.insert(name, value);
        Self { vars }
    }

    /// Binds every name of `vars` in one step.
    pub fn from_vars(vars: Vars) -> Self {
        Self { vars }
    }

    /// Binds an alternating `name, value, ...` list.
    pub fn from_pairs(pairs: &[Value]) -> StencilResult<Self> {
        Ok(Self {
            vars: Vars::from_pairs(pairs)?,
        })
    }
}

impl Generator for Data {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        debug!("Binding {} variable(s)", self.vars.len());
        ctx.vars_mut().merge(&self.vars);
        Ok(())
    }
}
