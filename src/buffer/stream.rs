//! Adapters between the wire contract and `std::io` streams.
//!
//! Use these to encode straight into a file or socket, or to decode from
//! one, without an intermediate buffer.
//!
//! # Example
//!
//! ```
//! use structwire::buffer::{IoReader, IoWriter};
//!
//! let mut writer = IoWriter::new(Vec::new());
//! structwire::encode(&mut writer, &(1u8, 2u32)).unwrap();
//! let bytes = writer.into_inner();
//!
//! let mut reader = IoReader::new(std::io::Cursor::new(bytes));
//! let value: (u8, u32) = structwire::decode(&mut reader).unwrap();
//! assert_eq!(value, (1, 2));
//! ```

use std::io::{self, Read, Write};

use super::{WireRead, WireWrite};
use crate::error::Result;

/// Reads wire bytes from any [`std::io::Read`].
///
/// Bytes pulled by a `try_read_bytes` that came up short are kept and
/// served first on the next read.
#[derive(Debug)]
pub struct IoReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> IoReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Get a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Number of bytes held back from a short `try_read_bytes`.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Unwrap the reader. Held back bytes are dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Top up `pending` to `need` bytes. `Ok(false)` on end of stream.
    fn fill_pending(&mut self, need: usize) -> io::Result<bool> {
        while self.pending.len() < need {
            let start = self.pending.len();
            self.pending.resize(need, 0);
            match self.inner.read(&mut self.pending[start..]) {
                Ok(0) => {
                    self.pending.truncate(start);
                    return Ok(false);
                }
                Ok(n) => self.pending.truncate(start + n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => self.pending.truncate(start),
                Err(e) => {
                    self.pending.truncate(start);
                    return Err(e);
                }
            }
        }
        Ok(true)
    }
}

impl<R: Read> WireRead for IoReader<R> {
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.pending.is_empty() {
            self.inner.read_exact(dst)?;
            return Ok(());
        }
        if !self.try_read_bytes(dst)? {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(())
    }

    fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool> {
        let need = dst.len();
        if !self.fill_pending(need)? {
            tracing::trace!("Short stream: {} of {} bytes held back", self.pending.len(), need);
            return Ok(false);
        }
        dst.copy_from_slice(&self.pending[..need]);
        self.pending.drain(..need);
        Ok(true)
    }
}

/// Writes wire bytes to any [`std::io::Write`].
#[derive(Debug)]
pub struct IoWriter<W> {
    inner: W,
}

impl<W: Write> IoWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush the wrapped writer.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> WireWrite for IoWriter<W> {
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.inner.write_all(src)?;
        Ok(())
    }
}
