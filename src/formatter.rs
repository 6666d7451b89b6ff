//! Source formatting capability used by the `Format` step.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use log::debug;

use crate::error::{StencilError, StencilResult};

/// Rewrites source bytes into their canonical formatting.
pub trait Formatter {
    fn format(&self, source: &[u8]) -> StencilResult<Vec<u8>>;
}

impl<F> Formatter for F
where
    F: Fn(&[u8]) -> StencilResult<Vec<u8>>,
{
    fn format(&self, source: &[u8]) -> StencilResult<Vec<u8>> {
        self(source)
    }
}

/// Formats by piping the source through an external program's stdin and
/// taking its stdout.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new<S: Into<String>>(program: S, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `rustfmt` reading from stdin.
    pub fn rustfmt() -> Self {
        Self::new("rustfmt", &["--edition", "2021"])
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, source: &[u8]) -> StencilResult<Vec<u8>> {
        debug!("Formatting with {} {}", self.program, self.args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StencilError::FormatError(format!("failed to run {}: {}", self.program, e)))?;

        // Fed from a separate thread so a large output cannot block the input.
        let writer = child.stdin.take().map(|mut stdin| {
            let source = source.to_vec();
            thread::spawn(move || stdin.write_all(&source))
        });

        let output = child.wait_with_output().map_err(StencilError::IoError)?;

        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| StencilError::FormatError("formatter input thread panicked".into()))?
                .map_err(StencilError::IoError)?;
        }

        if !output.status.success() {
            return Err(StencilError::FormatError(format!(
                "{} failed with status {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}
