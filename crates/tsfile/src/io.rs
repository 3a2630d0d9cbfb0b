//! Append-only output stream that knows its position and running checksum.

use std::io::{self, Write};

/// Wraps a sink, counting every byte written and feeding it to a CRC32.
///
/// The writer never seeks: chunk offsets recorded in the footer are taken
/// from [`PositionedWriter::position`] before each chunk is appended.
pub struct PositionedWriter<W: Write> {
    inner: W,
    position: u64,
    hasher: crc32fast::Hasher,
}

impl<W: Write> PositionedWriter<W> {
    /// Wraps `inner`, starting at position 0.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Number of bytes accepted so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// CRC32 of every byte accepted so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Returns a reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PositionedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
