//! Printing the caption.

use std::io::{self, Write};

/// Writes captions to an output stream, one per line.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write `text` followed by a newline and flush.
    pub fn report(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
