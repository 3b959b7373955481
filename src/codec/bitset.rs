//! Fixed-width bit sets.
//!
//! # Wire Format
//!
//! `W` bits take `ceil(W / 8)` bytes no matter which bits are set. Bit `i`
//! lives in byte `i / 8`, most significant bit first:
//!
//! ```text
//! bit:   0 1 2 3 4 5 6 7 | 8 9 ...
//! byte:  [      0      ] | [  1 ...
//! mask:  80 40 20 10 08 04 02 01
//! ```
//!
//! Padding bits in the last byte are written as zero and ignored on decode.

use std::fmt;

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// A set of `W` bits, indexed `0..W`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet<const W: usize> {
    // Stored in wire layout.
    bytes: Box<[u8]>,
}

impl<const W: usize> BitSet<W> {
    /// Number of bytes on the wire.
    pub const BYTE_LEN: usize = W.div_ceil(8);

    /// All bits cleared.
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; Self::BYTE_LEN].into_boxed_slice(),
        }
    }

    /// Parse a string of `'0'` and `'1'` characters.
    ///
    /// Follows the usual bit-string convention: the first `min(W, len)`
    /// characters are used and the first character is the highest of those
    /// bits, so `"110"` sets bits 2 and 1.
    pub fn from_bit_str(s: &str) -> Result<Self> {
        let used = &s.as_bytes()[..s.len().min(W)];
        let mut set = Self::new();
        for (pos, ch) in used.iter().enumerate() {
            let bit = used.len() - 1 - pos;
            match ch {
                b'0' => {}
                b'1' => set.set(bit, true),
                other => {
                    return Err(WireError::InvalidData(format!(
                        "invalid bit character {:?} at position {pos}",
                        char::from(*other)
                    )))
                }
            }
        }
        Ok(set)
    }

    /// Number of bits.
    #[inline]
    pub const fn len(&self) -> usize {
        W
    }

    /// `true` for the zero-width set.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        W == 0
    }

    #[inline]
    fn locate(bit: usize) -> (usize, u8) {
        assert!(bit < W, "bit index {bit} out of range for BitSet<{W}>");
        (bit / 8, 0x80 >> (bit % 8))
    }

    /// Value of bit `bit`.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= W`.
    #[inline]
    pub fn test(&self, bit: usize) -> bool {
        let (byte, mask) = Self::locate(bit);
        self.bytes[byte] & mask != 0
    }

    /// Set bit `bit` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= W`.
    #[inline]
    pub fn set(&mut self, bit: usize, value: bool) {
        let (byte, mask) = Self::locate(bit);
        if value {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Bits in index order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..W).map(move |bit| self.test(bit))
    }

    fn clear_padding(&mut self) {
        let used = W % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= 0xFF << (8 - used);
            }
        }
    }
}

impl<const W: usize> Default for BitSet<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> fmt::Display for BitSet<W> {
    /// Highest bit first, like [`BitSet::from_bit_str`] expects.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in (0..W).rev() {
            f.write_str(if self.test(bit) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl<const W: usize> fmt::Debug for BitSet<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSet<{W}>({self})")
    }
}

impl<const W: usize> Codec for BitSet<W> {
    const FIXED_SIZE: Option<usize> = Some(Self::BYTE_LEN);

    #[inline]
    fn encode<W2: WireWrite>(&self, buf: &mut W2) -> Result<()> {
        buf.write_bytes(&self.bytes)
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let mut set = Self::new();
        buf.read_bytes(&mut set.bytes)?;
        set.clear_padding();
        Ok(set)
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        Self::BYTE_LEN
    }
}
