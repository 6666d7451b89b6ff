#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use stencil::context::OutputContext;
use stencil::fs::{Filesystem, MemFs};
use stencil::report::Reporter;

/// Report sink that can be read back after the context has taken it.
#[derive(Clone, Default)]
pub struct Buffer(Rc<RefCell<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Context over `fs` rooted at `work_dir`, with an uncolored report buffer.
pub fn context_in<F, P>(fs: F, work_dir: P) -> (OutputContext, Buffer)
where
    F: Filesystem + 'static,
    P: AsRef<Path>,
{
    let buffer = Buffer::default();
    let ctx = OutputContext::new(fs, work_dir)
        .with_reporter(Reporter::new(Box::new(buffer.clone()), false));
    (ctx, buffer)
}

/// Context over an in-memory filesystem rooted at `.`.
pub fn mem_context(fs: &MemFs) -> (OutputContext, Buffer) {
    context_in(fs.clone(), ".")
}
