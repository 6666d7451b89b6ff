//! Built-in "new application" scaffold.

use std::path::PathBuf;

use cruet::Inflector;
use regex::Regex;

use crate::command::ExternalCommand;
use crate::error::{StencilError, StencilResult};
use crate::file::{Contents, File, Format, Mode, Template, Touch};
use crate::generator::{Data, Dir, Sequence};
use crate::processor::TemplateDir;
use crate::vars::Vars;

const CARGO_TOML: &str = r#"[package]
name = "{{ name }}"
version = "0.1.0"
edition = "2021"

[dependencies]
"#;

const MAIN_RS: &str = r#"fn main() {
    println!("Hello from {{ title }}!");
}
"#;

const README_MD: &str = r#"# {{ title }}

Run it with:

```sh
./scripts/dev.sh
```
"#;

const DEV_SH: &str = r#"#!/bin/sh
set -e
cargo run --bin {{ name }} -- "$@"
"#;

const GITIGNORE: &str = "/target\n";

/// What to generate.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub name: String,
    /// Dependencies added with `cargo add` once the manifest exists
    pub deps: Vec<String>,
    /// Run generated Rust sources through rustfmt
    pub format: bool,
    /// Render this template directory instead of the built-in skeleton
    pub template: Option<PathBuf>,
    /// Extra bindings, applied after the derived ones
    pub vars: Vars,
}

/// Checks that `name` can be used as a directory and package name.
///
/// # Errors
/// * `StencilError::ConfigError` if the name is empty or has characters
///   other than ASCII letters, digits, `-` and `_`, or starts with a digit
pub fn validate_name(name: &str) -> StencilResult<()> {
    let pattern = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$")
        .map_err(|e| StencilError::ConfigError(e.to_string()))?;
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(StencilError::ConfigError(format!(
            "invalid application name {:?}",
            name
        )))
    }
}

/// Bindings derived from the application name.
pub fn app_vars(name: &str) -> Vars {
    let mut vars = Vars::new();
    vars.insert("name", name);
    vars.insert("crate_name", name.to_snake_case());
    vars.insert("title", name.to_title_case());
    vars
}

/// Builds the generator tree for a new application under `options.name`.
pub fn new_app(options: &AppOptions) -> StencilResult<Sequence> {
    validate_name(&options.name)?;

    let mut vars = app_vars(&options.name);
    vars.insert("dependencies", options.deps.clone());
    vars.merge(&options.vars);

    let add_deps = if options.deps.is_empty() {
        None
    } else {
        Some(ExternalCommand::cargo_add(&options.deps))
    };

    let root = match &options.template {
        Some(template) => Dir::new(options.name.as_str())
            .with(TemplateDir::new(template.clone()))
            .with_opt(add_deps),
        None => {
            let main_rs = File::new("main.rs").with(Template::new(MAIN_RS));
            let main_rs = if options.format {
                main_rs.with(Format::rustfmt())
            } else {
                main_rs
            };

            Dir::new(options.name.as_str())
                .with(File::new("Cargo.toml").with(Template::new(CARGO_TOML)))
                .with(File::new("README.md").with(Template::new(README_MD)))
                .with(File::new(".gitignore").with(Contents::text(GITIGNORE)))
                .with(Dir::new("src").with(main_rs))
                .with(
                    Dir::new("scripts").with(
                        File::new("dev.sh")
                            .with(Template::new(DEV_SH))
                            .with(Mode::executable()),
                    ),
                )
                .with(File::new(".env").with(Touch))
                .with_opt(add_deps)
        }
    };

    Ok(Sequence::new().with(Data::from_vars(vars)).with(root))
}
