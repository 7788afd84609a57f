//! `tracing-subscriber` writer that redacts every formatted event.

use std::io::{self, Write};

use tracing_subscriber::fmt::MakeWriter;

use crate::redactor::PiiRedactor;

/// Wraps another [`MakeWriter`] and redacts each line before it reaches the sink
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
    redactor: PiiRedactor,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, redactor: PiiRedactor) -> Self {
        Self { inner, redactor }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: &self.redactor,
            buffer: Vec::new(),
        }
    }
}

/// Buffers one event and writes its redacted form on flush or drop
pub struct RedactingWriter<'a, W: Write> {
    inner: W,
    redactor: &'a PiiRedactor,
    buffer: Vec<u8>,
}

impl<W: Write> RedactingWriter<'_, W> {
    fn drain(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let redacted = self.redactor.redact(&String::from_utf8_lossy(&self.buffer));
        self.buffer.clear();
        self.inner.write_all(redacted.as_bytes())
    }
}

impl<W: Write> Write for RedactingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<'_, W> {
    fn drop(&mut self) {
        let _ = self.drain();
    }
}
