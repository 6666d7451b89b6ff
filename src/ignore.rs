//! File and directory ignore pattern handling for template directories.
//! This module processes .stencilignore files to exclude specific paths
//! from a template directory walk, similar to .gitignore functionality.

use crate::constants::IGNORE_FILE;
use crate::error::{StencilError, StencilResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::{fs::read_to_string, path::Path};

/// Patterns ignored in every template directory.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 3] = ["**/.git/**", "**/.DS_Store", "**/.stencilignore"];

/// Reads the template's .stencilignore file into a set of glob patterns.
///
/// # Arguments
/// * `template_root` - Root of the template directory
///
/// # Returns
/// * `StencilResult<GlobSet>` - Default patterns plus one per non-empty line
///
/// # Notes
/// - A missing .stencilignore only yields the default patterns
/// - Lines starting with `#` are comments
/// - Invalid patterns result in a StencilError::IgnoreError
pub fn parse_ignore_file<P: AsRef<Path>>(template_root: P) -> StencilResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_IGNORE_PATTERNS {
        builder.add(build_glob(pattern)?);
    }

    let ignore_path = template_root.as_ref().join(IGNORE_FILE);
    if let Ok(contents) = read_to_string(&ignore_path) {
        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            builder.add(build_glob(line)?);
        }
    } else {
        debug!("{} does not exist", ignore_path.display());
    }

    builder
        .build()
        .map_err(|e| StencilError::IgnoreError(format!(".stencilignore loading failed: {}", e)))
}

fn build_glob(pattern: &str) -> StencilResult<Glob> {
    Glob::new(pattern)
        .map_err(|e| StencilError::IgnoreError(format!(".stencilignore loading failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_without_file() {
        let glob_set = parse_ignore_file("/nonexistent/template").unwrap();
        assert!(glob_set.is_match(".git/config"));
        assert!(glob_set.is_match("nested/.DS_Store"));
        assert!(!glob_set.is_match("src/main.rs"));
    }
}
