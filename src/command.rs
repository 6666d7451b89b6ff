//! External dependency-management command as a generator.
//!
//! The process is a black box that mutates two manifest files. The
//! manifests are captured before it runs and reported afterwards with the
//! same create/identical/overwrite protocol as file generators.

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::context::OutputContext;
use crate::error::{StencilError, StencilResult};
use crate::generator::Generator;
use crate::report::Category;

pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    deps: Vec<String>,
    primary: String,
    secondary: String,
}

impl ExternalCommand {
    /// Runs `program args... deps...` in the working directory and reports
    /// the `primary` and `secondary` manifests.
    pub fn new<S: AsRef<str>>(
        program: &str,
        args: &[&str],
        deps: &[S],
        primary: &str,
        secondary: &str,
    ) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            deps: deps.iter().map(|d| d.as_ref().to_string()).collect(),
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        }
    }

    /// `cargo add <deps>`, touching `Cargo.toml` and `Cargo.lock`.
    pub fn cargo_add<S: AsRef<str>>(deps: &[S]) -> Self {
        Self::new("cargo", &["add"], deps, "Cargo.toml", "Cargo.lock")
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Guess for dry runs: the command changes the manifests unless one of
    /// the dependencies already appears in the primary manifest text.
    ///
    /// This is best-effort. The match is a plain substring search over the
    /// whole manifest, so a dependency named like the package itself (or
    /// like any other word in the file) is taken as already present.
    fn would_change(&self, manifest: Option<&[u8]>) -> bool {
        let text = manifest.map(String::from_utf8_lossy).unwrap_or_default();
        !self.deps.iter().any(|dep| text.contains(dep.as_str()))
    }

    fn run(&self, work_dir: &Path) -> StencilResult<()> {
        debug!(
            "Running {} {} {} in {}",
            self.program,
            self.args.join(" "),
            self.deps.join(" "),
            work_dir.display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&self.deps)
            .current_dir(work_dir)
            .output()
            .map_err(|e| StencilError::CommandError(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(StencilError::CommandError(format!(
                "{} failed with status {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Generator for ExternalCommand {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        let primary = ctx.file(&self.primary);
        let secondary = ctx.file(&self.secondary);
        let primary_before = ctx.read(&primary)?;
        let secondary_before = ctx.read(&secondary)?;

        if ctx.is_dry_run() {
            let category = if self.would_change(primary_before.as_deref()) {
                Category::Overwrite
            } else {
                Category::Identical
            };
            ctx.report(category, &primary)?;
            return ctx.report(category, &secondary);
        }

        if let Err(e) = self.run(&ctx.work_dir()) {
            ctx.report(Category::Error, &primary)?;
            return Err(e);
        }

        ctx.report_change(
            primary_before.as_deref().unwrap_or_default(),
            &primary,
            primary_before.is_none(),
        )?;
        ctx.report_change(
            secondary_before.as_deref().unwrap_or_default(),
            &secondary,
            secondary_before.is_none(),
        )
    }
}
