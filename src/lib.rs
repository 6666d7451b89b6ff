//! Stencil is a scaffold generation engine.
//! A tree of declarative generators is run against an execution context that
//! expands name templates, runs file content pipelines and reports every
//! touched file as created, identical or overwritten, with a dry-run mode
//! that computes the same report without writing.

/// Built-in "new application" scaffold
pub mod app;

/// Command-line interface module for the Stencil binary
pub mod cli;

/// External dependency-management command generator
pub mod command;

/// Optional stencil.json / stencil.yml / stencil.yaml configuration
pub mod config;

/// Common constants
pub mod constants;

/// Per-run execution context: bindings, directory stack, flags, reporting
pub mod context;

/// Error types and handling for the Stencil crate
pub mod error;

/// File generator and its content pipeline steps
pub mod file;

/// Source formatting capability
pub mod formatter;

/// Filesystem capability and its OS-backed and in-memory implementations
pub mod fs;

/// Generator trait and the composite generators
pub mod generator;

/// .stencilignore patterns for template directories
pub mod ignore;

/// Logger initialization
pub mod logger;

/// Template directory walking
pub mod processor;

/// Change report formatting
pub mod report;

/// Template rendering
pub mod renderer;

/// Variable bindings
pub mod vars;
