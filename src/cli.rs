//! Command-line interface implementation for Stencil.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for Stencil.
#[derive(Parser, Debug)]
#[command(author, version, about = "Stencil: generate a new application skeleton", long_about = None)]
pub struct Args {
    /// Name of the application to create
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Replace existing files whose contents differ
    #[arg(short = 'f', long)]
    pub overwrite: bool,

    /// Report what would change without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Directory the application is created in
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Render this template directory instead of the built-in skeleton
    #[arg(short, long, value_name = "DIR")]
    pub template: Option<PathBuf>,

    /// Dependency to add with `cargo add` (repeatable)
    #[arg(short, long = "dep", value_name = "CRATE")]
    pub deps: Vec<String>,

    /// Run generated Rust sources through rustfmt
    #[arg(long)]
    pub fmt: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
