//! Append-only output sinks.
//!
//! The creator never seeks: it appends bytes and asks for the current offset
//! when it needs to record where an object starts.

use crate::error::Result;
use std::io::Write;

/// Sequential byte writer with a queryable offset.
pub trait OutputSink {
    /// Number of bytes written so far.
    fn offset(&self) -> u64;

    /// Append raw bytes.
    fn write_block(&mut self, data: &[u8]) -> Result<()>;

    /// Append an ASCII string.
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_block(s.as_bytes())
    }

    /// Append a decimal integer.
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_str(&value.to_string())
    }

    /// Append a decimal integer.
    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_str(&value.to_string())
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn offset(&self) -> u64 {
        (**self).offset()
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_block(data)
    }
}

/// In-memory sink.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl OutputSink for VecSink {
    fn offset(&self) -> u64 {
        self.buf.len() as u64
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }
}

/// Sink over any [`Write`], counting the bytes that pass through.
///
/// Wrap files in a `BufWriter`; the creator issues many small writes.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer positioned at offset 0.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Take the underlying writer back.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputSink for WriteSink<W> {
    fn offset(&self) -> u64 {
        self.written
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }
}
