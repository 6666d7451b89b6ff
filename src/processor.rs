//! Turns an on-disk template directory into file generators.
//!
//! Every file under the template root becomes a [`File`] whose name is its
//! relative path (expanded against the bindings like any other name).
//! `name.ext.j2` files are rendered and written as `name.ext`; everything
//! else is copied byte for byte.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::constants::TEMPLATE_SUFFIX;
use crate::context::OutputContext;
use crate::error::{StencilError, StencilResult};
use crate::file::{Contents, File, Mode, Template};
use crate::generator::Generator;
use crate::ignore::parse_ignore_file;

/// Generator copying and rendering a template directory into the working
/// directory.
pub struct TemplateDir {
    root: PathBuf,
}

impl TemplateDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn file_for(&self, source: &Path, target: String, is_template: bool) -> StencilResult<File> {
        let bytes = fs::read(source)?;
        let file = if is_template {
            let body = String::from_utf8(bytes).map_err(|e| {
                StencilError::TemplateError(format!("{} is not UTF-8: {}", source.display(), e))
            })?;
            File::new(target).with(Template::new(body))
        } else {
            File::new(target).with(Contents::bytes(bytes))
        };

        Ok(if is_executable(source)? {
            file.with(Mode::executable())
        } else {
            file
        })
    }
}

impl Generator for TemplateDir {
    fn generate(&self, ctx: &mut OutputContext) -> StencilResult<()> {
        debug!("Processing template directory {}", self.root.display());
        if !self.root.is_dir() {
            return Err(StencilError::ConfigError(format!(
                "template directory {} does not exist",
                self.root.display()
            )));
        }
        let ignored = parse_ignore_file(&self.root)?;

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| StencilError::IoError(e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| StencilError::ConfigError(e.to_string()))?;
            if ignored.is_match(relative) {
                debug!("Skipping {} from .stencilignore", relative.display());
                continue;
            }
            let relative = relative
                .to_str()
                .ok_or_else(|| StencilError::ConfigError("Invalid path".to_string()))?;

            // Conditional names may render to nothing; such entries are skipped.
            let rendered = ctx.expand(relative);
            if !is_rendered_path_valid(&rendered) {
                debug!("Skipping {}: rendered path {:?} is empty", relative, rendered);
                continue;
            }

            let (target, is_template) = resolve_target_name(relative);
            self.file_for(entry.path(), target, is_template)?
                .generate(ctx)?;
        }
        Ok(())
    }
}

/// True for `name.ext.j2`: a double extension ending in the template suffix.
pub fn is_jinja_template(filename: &str) -> bool {
    let parts: Vec<&str> = filename.split('.').collect();
    parts.len() > 2 && filename.ends_with(TEMPLATE_SUFFIX)
}

/// Strips the template suffix from the file name, if present.
///
/// Returns the target name and whether the body must be rendered.
pub fn resolve_target_name(relative: &str) -> (String, bool) {
    let filename = Path::new(relative)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if is_jinja_template(filename) {
        if let Some(stripped) = relative.strip_suffix(TEMPLATE_SUFFIX) {
            return (stripped.to_string(), true);
        }
    }
    (relative.to_string(), false)
}

/// A rendered path is usable when no segment rendered empty.
pub fn is_rendered_path_valid(rendered: &str) -> bool {
    !rendered.trim().is_empty() && !rendered.starts_with('/') && !rendered.contains("//")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> StencilResult<bool> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> StencilResult<bool> {
    Ok(false)
}
