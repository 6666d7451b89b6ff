//! Change report written once per touched file.
//!
//! Each line is the category label right-aligned to [`LABEL_WIDTH`], two
//! spaces, the path, and ` (dry-run)` when nothing was persisted:
//!
//! ```text
//!       create  bin/new.txt
//!    identical  Cargo.toml (dry-run)
//! ```

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use owo_colors::OwoColorize;

use crate::constants::LABEL_WIDTH;

/// Outcome of touching one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Create,
    Identical,
    Overwrite,
    Conflict,
    Error,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Create => "create",
            Category::Identical => "identical",
            Category::Overwrite => "overwrite",
            Category::Conflict => "conflict",
            Category::Error => "error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Writes report lines to a sink, colored or plain.
pub struct Reporter {
    out: Box<dyn Write>,
    color: bool,
}

impl Reporter {
    pub fn new(out: Box<dyn Write>, color: bool) -> Self {
        Self { out, color }
    }

    /// Reporter on stdout, colored when stdout is a terminal.
    pub fn stdout() -> Self {
        use std::io::IsTerminal;
        let color = io::stdout().is_terminal();
        Self::new(Box::new(io::stdout()), color)
    }

    pub fn report(&mut self, category: Category, path: &Path, dry_run: bool) -> io::Result<()> {
        let line = format_line(category, path, dry_run, self.color);
        self.out.write_all(line.as_bytes())?;
        self.out.flush()
    }
}

/// Formats one report line, including the trailing newline.
pub fn format_line(category: Category, path: &Path, dry_run: bool, color: bool) -> String {
    let label = format!("{:>width$}", category.label(), width = LABEL_WIDTH);
    let label = if color {
        match category {
            Category::Error => label.red().to_string(),
            Category::Create => label.green().to_string(),
            Category::Overwrite => label.cyan().to_string(),
            Category::Identical => label.bright_black().to_string(),
            Category::Conflict => label.yellow().to_string(),
        }
    } else {
        label
    };
    let suffix = if dry_run { " (dry-run)" } else { "" };
    format!("{}  {}{}\n", label, path.display(), suffix)
}
