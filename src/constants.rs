//! Common constants used throughout the Stencil crate.

/// Supported configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 3] = ["stencil.json", "stencil.yml", "stencil.yaml"];

/// Stencil's ignore file name, read from the root of a template directory
pub const IGNORE_FILE: &str = ".stencilignore";

/// Suffix marking a template file whose body must be rendered
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// Width the change-report category label is right-aligned to
pub const LABEL_WIDTH: usize = 12;

/// Mode used when creating missing parent directories
pub const DIR_MODE: u32 = 0o755;

/// Mode given to newly created files
pub const FILE_MODE: u32 = 0o644;

/// Permission preset for read-only files
pub const READ_ONLY_MODE: u32 = 0o444;

/// Permission preset for executable files
pub const EXECUTABLE_MODE: u32 = 0o755;
