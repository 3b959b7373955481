//! Base-128 variable-length unsigned integers.
//!
//! # Wire Format
//!
//! ```text
//! 300 = 0b10_0101100
//!
//! +------------+------------+
//! | 1 0000010  | 0 0101100  |
//! +------------+------------+
//!   0x82         0x2C
//! ```
//!
//! Groups of 7 bits, most significant group first. Every byte except the
//! last has the continuation bit (`0x80`) set. Zero is a single `0x00`.
//!
//! Decoding fails with [`WireError::VarIntOverflow`] as soon as the value
//! would no longer fit in a `u64`. Leading zero groups (`0x80`) are
//! accepted, so a redundant encoding decodes to the same value. The input
//! length bounds how many of them are read.

use std::fmt;

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// Longest minimal encoding of a `u64` (64 bits / 7 rounded up).
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

/// Number of bytes the varint encoding of `value` occupies.
#[inline]
pub const fn varint_size(value: u64) -> usize {
    // Zero still takes one bit.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Write `value` as a varint.
pub fn encode_varint<W: WireWrite + ?Sized>(buf: &mut W, value: u64) -> Result<()> {
    let len = varint_size(value);
    let mut out = [0u8; MAX_VARINT_LEN];
    for (i, byte) in out[..len].iter_mut().enumerate() {
        let shift = 7 * (len - 1 - i);
        // Masked to 7 bits, so the narrowing is lossless.
        let group = ((value >> shift) & u64::from(PAYLOAD_MASK)) as u8;
        *byte = if i + 1 < len { group | CONTINUATION } else { group };
    }
    buf.write_bytes(&out[..len])
}

/// Read a varint.
pub fn decode_varint<R: WireRead + ?Sized>(buf: &mut R) -> Result<u64> {
    let mut value: u64 = 0;
    loop {
        let byte = buf.read_u8()?;
        if (value << 7) >> 7 != value {
            tracing::debug!("Varint overflow after accumulating {value:#x}");
            return Err(WireError::VarIntOverflow);
        }
        value = (value << 7) | u64::from(byte & PAYLOAD_MASK);
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
    }
}

/// A `u64` encoded as a varint.
///
/// Use it as a field type to get the compact encoding:
///
/// ```
/// use structwire::{Codec, VarInt};
///
/// #[derive(Codec)]
/// struct Counter {
///     hits: VarInt,
/// }
///
/// let bytes = structwire::to_bytes(&Counter { hits: VarInt(300) }).unwrap();
/// assert_eq!(&bytes[..], &[0x82, 0x2C]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(pub u64);

impl VarInt {
    /// The wrapped value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(value: u64) -> Self {
        VarInt(value)
    }
}

impl From<u32> for VarInt {
    fn from(value: u32) -> Self {
        VarInt(u64::from(value))
    }
}

impl From<VarInt> for u64 {
    fn from(value: VarInt) -> Self {
        value.0
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Codec for VarInt {
    #[inline]
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_varint(buf, self.0)
    }

    #[inline]
    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        decode_varint(buf).map(VarInt)
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        varint_size(self.0)
    }
}

/// Write a collection length as a varint.
pub(crate) fn encode_len<W: WireWrite + ?Sized>(buf: &mut W, len: usize) -> Result<()> {
    let len = u64::try_from(len)
        .map_err(|_| WireError::InvalidData(format!("length {len} exceeds u64")))?;
    encode_varint(buf, len)
}

/// Read a collection length, rejecting values this platform cannot index.
pub(crate) fn decode_len<R: WireRead + ?Sized>(buf: &mut R) -> Result<usize> {
    let len = decode_varint(buf)?;
    usize::try_from(len)
        .map_err(|_| WireError::InvalidData(format!("length {len} not addressable")))
}

/// Varint size of a collection length.
#[inline]
pub(crate) fn len_size(len: usize) -> usize {
    u64::try_from(len).map_or(MAX_VARINT_LEN, varint_size)
}
