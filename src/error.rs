//! Error handling for the Stencil engine.
//! Defines custom error types and results used throughout the crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for Stencil operations.
///
/// Every variant except `TemplateParseError` raised during file name expansion
/// is fatal: it aborts the remaining generator tree.
#[derive(Error, Debug)]
pub enum StencilError {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors that occur while executing a template body
    #[error("Template error: {0}.")]
    TemplateError(String),

    /// Represents syntax errors in a template source
    #[error("Template parse error: {0}.")]
    TemplateParseError(String),

    /// Working-directory stack misuse, e.g. popping the root scope
    #[error("Directory stack error: {0}.")]
    DirStackError(String),

    /// An external process could not be started or exited unsuccessfully
    #[error("Command error: {0}.")]
    CommandError(String),

    /// The source formatter rejected its input
    #[error("Format error: {0}.")]
    FormatError(String),

    /// A helper was called with arguments that can never be valid
    #[error("Misuse error: {0}.")]
    MisuseError(String),

    /// An existing file would be replaced while overwriting is disabled
    #[error("Conflict error: {} already exists with different contents.", .path.display())]
    ConflictError { path: PathBuf },

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Structured values that could not be serialized as file contents
    #[error("Serialization error: {0}.")]
    SerializeError(#[from] serde_json::Error),

    /// Represents errors in processing .stencilignore files
    #[error("StencilIgnore error: {0}.")]
    IgnoreError(String),
}

impl StencilError {
    /// Returns true when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StencilError::IoError(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Convenience type alias for Results with StencilError as the error type.
pub type StencilResult<T> = Result<T, StencilError>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The StencilError to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: StencilError) {
    eprintln!("{}", err);
    std::process::exit(1);
}
