//! Length-prefixed framing for stream transports.
//!
//! # Wire Format
//!
//! ```text
//! +-----------------+------------+------------------+
//! | length (L, BE)  | type index | payload          |
//! +-----------------+------------+------------------+
//!                   |<-------- length bytes ------->|
//! ```
//!
//! The length field type `L` is chosen per stream (`u8`, `u16`, `u32` or
//! `u64`) and covers exactly the tagged message. A message too large for
//! `L` is rejected before anything is written.
//!
//! [`FrameDecoder`] accumulates arbitrary chunks with a state machine:
//! - `WaitingForLength`: need `L::WIDTH` bytes
//! - `WaitingForBody`: length parsed, need N more body bytes
//!
//! # Example
//!
//! ```
//! use structwire::protocol::{encode_frame, FrameDecoder};
//!
//! let mut wire = Vec::new();
//! encode_frame::<u16, _>(&mut wire, b"hello").unwrap();
//!
//! let mut decoder = FrameDecoder::<u16>::new();
//! assert!(decoder.push(&wire[..3]).unwrap().is_empty());
//!
//! let frames = decoder.push(&wire[3..]).unwrap();
//! assert_eq!(&frames[0][..], b"hello");
//! ```

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// Default maximum frame body length (64 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Default initial decoder buffer capacity (64 KiB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 64 * 1024;

/// Unsigned integer usable as a frame length prefix.
pub trait LengthField: Codec + Copy + Into<u64> + Send + Sync + 'static {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Largest representable length.
    const MAX: u64;

    /// Convert a length, `None` if it does not fit.
    fn from_len(len: usize) -> Option<Self>;
}

macro_rules! impl_length_field {
    ($($ty:ty),*) => {$(
        impl LengthField for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            const MAX: u64 = <$ty>::MAX as u64;

            #[inline]
            fn from_len(len: usize) -> Option<Self> {
                <$ty>::try_from(len).ok()
            }
        }
    )*};
}

impl_length_field!(u8, u16, u32, u64);

/// Write `len` as an `L` length prefix.
///
/// # Errors
///
/// Returns [`WireError::MessageLengthOverflow`] if `len` exceeds `L::MAX`.
pub fn encode_length<L: LengthField, W: WireWrite + ?Sized>(buf: &mut W, len: usize) -> Result<()> {
    let Some(field) = L::from_len(len) else {
        tracing::warn!(
            "Message length {} exceeds {}-byte length field",
            len,
            L::WIDTH
        );
        return Err(WireError::MessageLengthOverflow {
            length: len,
            max: L::MAX,
        });
    };
    let mut buf = buf;
    field.encode(&mut buf)
}

/// Write `body` as one frame: length prefix then the bytes.
pub fn encode_frame<L: LengthField, W: WireWrite + ?Sized>(buf: &mut W, body: &[u8]) -> Result<()> {
    encode_length::<L, W>(buf, body.len())?;
    buf.write_bytes(body)
}

/// Read an `L` length prefix.
pub fn decode_length<L: LengthField, R: WireRead + ?Sized>(buf: &mut R) -> Result<u64> {
    let mut buf = buf;
    Ok(L::decode(&mut buf)?.into())
}

/// Frame decoding limits.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest accepted frame body, in bytes.
    pub max_frame_len: usize,
    /// Initial capacity of the accumulation buffer.
    pub initial_capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl FrameConfig {
    /// Set the largest accepted frame body.
    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    /// Set the initial buffer capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Accept a received length if it is within the configured maximum.
    pub(crate) fn check_len(&self, len: u64) -> Result<usize> {
        match usize::try_from(len) {
            Ok(len) if len <= self.max_frame_len => Ok(len),
            _ => {
                tracing::warn!(
                    "Frame length {} exceeds maximum {}",
                    len,
                    self.max_frame_len
                );
                Err(WireError::FrameTooLarge {
                    length: usize::try_from(len).unwrap_or(usize::MAX),
                    max: self.max_frame_len,
                })
            }
        }
    }
}

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete length field.
    WaitingForLength,
    /// Length parsed, waiting for body bytes.
    WaitingForBody { remaining: usize },
}

/// Accumulates incoming bytes and extracts complete frame bodies.
///
/// All data lives in a single `BytesMut`; extracted bodies are split off
/// and frozen without copying.
#[derive(Debug)]
pub struct FrameDecoder<L> {
    buffer: BytesMut,
    state: State,
    config: FrameConfig,
    _length: PhantomData<fn() -> L>,
}

impl<L: LengthField> FrameDecoder<L> {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with custom limits.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.initial_capacity),
            state: State::WaitingForLength,
            config,
            _length: PhantomData,
        }
    }

    /// Push data and extract all complete frame bodies.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::FrameTooLarge`] if a frame announces a body
    /// above `max_frame_len`. The decoder should be cleared or dropped
    /// afterwards; the stream is no longer in sync.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::WaitingForLength => {
                if self.buffer.len() < L::WIDTH {
                    return Ok(None);
                }

                let mut head = &self.buffer[..L::WIDTH];
                let len = self.config.check_len(decode_length::<L, _>(&mut head)?)?;

                let _ = self.buffer.split_to(L::WIDTH);

                if len == 0 {
                    tracing::trace!("Extracted empty frame");
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForBody { remaining: len };
                self.try_extract_one()
            }

            State::WaitingForBody { remaining } => {
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let body = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForLength;

                tracing::trace!("Extracted frame of {} bytes", body.len());
                Ok(Some(body))
            }
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Active limits.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl<L: LengthField> Default for FrameDecoder<L> {
    fn default() -> Self {
        Self::new()
    }
}
