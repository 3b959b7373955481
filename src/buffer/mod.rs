//! Byte buffer contract consumed by every codec.
//!
//! Codecs never look inside a buffer. They only call:
//!
//! - [`WireRead::read_bytes`] - fill a slice completely or fail
//! - [`WireRead::try_read_bytes`] - same, but report a short buffer as `Ok(false)`
//! - [`WireWrite::write_bytes`] - append a slice
//!
//! In-memory buffers additionally expose `available_bytes()` and `clear()`.
//!
//! # Implementations
//!
//! - `&[u8]`, [`Bytes`] and [`BytesMut`] read from the front
//! - `Vec<u8>` and [`BytesMut`] append
//! - [`VecBuffer`] - growable buffer with a read cursor and a trim policy
//! - [`IoReader`] / [`IoWriter`] - adapters over `std::io`
//! - [`BufferPool`] - recycles `VecBuffer`s between producer and consumer
//!
//! # Example
//!
//! ```
//! use structwire::buffer::{WireRead, WireWrite};
//!
//! let mut out = Vec::new();
//! out.write_bytes(&[1, 2, 3]).unwrap();
//!
//! let mut input = &out[..];
//! assert_eq!(input.read_array::<2>().unwrap(), [1, 2]);
//! assert_eq!(input.remaining_hint(), Some(1));
//! ```

mod pool;
mod stream;
mod vec_buffer;

pub use pool::{
    BufferPool, BufferQueue, PoolConfig, RecycleOrder, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_MAX_IDLE_BUFFERS,
};
pub use stream::{IoReader, IoWriter};
pub use vec_buffer::{TrimPolicy, VecBuffer, DEFAULT_TRIM_THRESHOLD};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Source of bytes for decoding.
pub trait WireRead {
    /// Fill `dst` completely.
    ///
    /// On failure nothing is consumed for in-memory buffers. Stream
    /// adapters cannot un-read, so a failed stream read leaves the stream
    /// position unspecified.
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()>;

    /// Fill `dst` completely if enough bytes are available.
    ///
    /// Returns `Ok(false)` and consumes nothing when the source is short.
    fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool>;

    /// Number of bytes left, if the source knows it.
    fn remaining_hint(&self) -> Option<usize> {
        None
    }

    /// Read exactly `N` bytes into an array.
    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.read_bytes(&mut out)?;
        Ok(out)
    }

    /// Read a single byte.
    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }
}

/// Sink of bytes for encoding.
pub trait WireWrite {
    /// Append all of `src`.
    fn write_bytes(&mut self, src: &[u8]) -> Result<()>;

    /// Append a single byte.
    #[inline]
    fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }
}

#[inline]
pub(crate) fn underflow(requested: usize, available: usize) -> WireError {
    WireError::BufferUnderflow {
        requested,
        available,
    }
}

impl<R: WireRead + ?Sized> WireRead for &mut R {
    #[inline]
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        (**self).read_bytes(dst)
    }

    #[inline]
    fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool> {
        (**self).try_read_bytes(dst)
    }

    #[inline]
    fn remaining_hint(&self) -> Option<usize> {
        (**self).remaining_hint()
    }
}

impl<W: WireWrite + ?Sized> WireWrite for &mut W {
    #[inline]
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        (**self).write_bytes(src)
    }
}

impl WireRead for &[u8] {
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.len() < dst.len() {
            return Err(underflow(dst.len(), self.len()));
        }
        let (head, tail) = self.split_at(dst.len());
        dst.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool> {
        if self.len() < dst.len() {
            return Ok(false);
        }
        self.read_bytes(dst)?;
        Ok(true)
    }

    #[inline]
    fn remaining_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

macro_rules! impl_wire_read_for_buf {
    ($($ty:ty),*) => {$(
        impl WireRead for $ty {
            fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
                if self.remaining() < dst.len() {
                    return Err(underflow(dst.len(), self.remaining()));
                }
                self.copy_to_slice(dst);
                Ok(())
            }

            fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool> {
                if self.remaining() < dst.len() {
                    return Ok(false);
                }
                self.copy_to_slice(dst);
                Ok(true)
            }

            #[inline]
            fn remaining_hint(&self) -> Option<usize> {
                Some(self.remaining())
            }
        }
    )*};
}

impl_wire_read_for_buf!(Bytes, BytesMut);

impl WireWrite for Vec<u8> {
    #[inline]
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.extend_from_slice(src);
        Ok(())
    }
}

impl WireWrite for BytesMut {
    #[inline]
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.put_slice(src);
        Ok(())
    }
}
