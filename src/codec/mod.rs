//! Codec module - per-type encode/decode/size dispatch.
//!
//! Every serializable type implements [`Codec`]. The trait is the registry:
//! the compiler picks the implementation from the static type, recursing
//! through composites, so `Vec<Option<(u16, String)>>` needs no extra code.
//!
//! - [`primitive`] - integers (big endian), floats (IEEE-754 bits), `bool`, `char`
//! - [`varint`] - base-128 variable-length unsigned integers
//! - [`collections`] - length-prefixed sequences, sets, maps, strings
//! - [`composite`] - arrays, tuples, `Option`, `Box`, unit
//! - [`bitset`] - fixed-width bit sets
//! - [`magic`] - constant tags validated on decode
//! - [`tag`] - minimal-width tags for sum types and message sets
//!
//! Plain structs and enums get a codec from `#[derive(Codec)]`. Any other
//! type registers a custom codec by implementing [`Codec`] by hand; it then
//! works everywhere a built-in type does, including inside containers.
//!
//! # Example
//!
//! ```
//! use structwire::Codec;
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Point {
//!     x: i16,
//!     y: i16,
//! }
//!
//! let bytes = structwire::to_bytes(&Point { x: 1, y: -1 }).unwrap();
//! assert_eq!(&bytes[..], &[0x00, 0x01, 0xFF, 0xFF]);
//!
//! let back: Point = structwire::from_bytes(&bytes).unwrap();
//! assert_eq!(back, Point { x: 1, y: -1 });
//! assert_eq!(structwire::fixed_size::<Point>(), Some(4));
//! ```
//!
//! # Enums
//!
//! Declared discriminants travel as the integer named by `#[repr]`:
//!
//! ```
//! use structwire::Codec;
//!
//! #[derive(Codec, Debug, PartialEq)]
//! #[repr(u8)]
//! enum Level {
//!     Low = 10,
//!     High = 20,
//! }
//!
//! assert_eq!(&structwire::to_bytes(&Level::High).unwrap()[..], &[20]);
//! ```
//!
//! Without an integer repr the discriminants would have no wire width, so
//! the derive refuses them:
//!
//! ```compile_fail
//! use structwire::Codec;
//!
//! #[derive(Codec)]
//! enum Level {
//!     Low = 10,
//!     High = 20,
//! }
//! ```
//!
//! `usize` and `isize` are refused as well:
//!
//! ```compile_fail
//! use structwire::Codec;
//!
//! #[derive(Codec)]
//! #[repr(usize)]
//! enum Level {
//!     Low = 10,
//!     High = 20,
//! }
//! ```

pub mod bitset;
pub mod collections;
pub mod composite;
pub mod magic;
pub mod primitive;
pub mod tag;
pub mod varint;

use bytes::{Bytes, BytesMut};

use crate::buffer::{WireRead, WireWrite};
use crate::error::{Result, WireError};

/// Encode, decode and size operations for one type.
///
/// Implementations are stateless. For every value `v`:
///
/// - `v.encoded_size()` equals the number of bytes `v.encode(..)` writes
/// - decoding what `v.encode(..)` wrote yields a value equal to `v`
///
/// Decoding reads fields in exactly the order encoding wrote them.
#[diagnostic::on_unimplemented(
    message = "`{Self}` has no wire codec",
    label = "not serializable",
    note = "derive `Codec` for plain structs and enums, or implement `Codec` by hand to register a custom codec",
    note = "raw pointers and references are never serializable: the address they carry is meaningless in another process or run",
    note = "`usize`, `isize`, `OsString` and `PathBuf` are excluded because their representation is platform-dependent; use a fixed-width integer, `VarInt` or `String`"
)]
pub trait Codec: Sized {
    /// Encoded size when it is the same for every value, `None` otherwise.
    const FIXED_SIZE: Option<usize> = None;

    /// Write this value to `buf`.
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()>;

    /// Read a value from `buf`.
    fn decode<R: WireRead>(buf: &mut R) -> Result<Self>;

    /// Number of bytes [`Codec::encode`] writes for this value.
    fn encoded_size(&self) -> usize;
}

/// Encode `value` into `buf`.
#[inline]
pub fn encode<W: WireWrite, T: Codec>(buf: &mut W, value: &T) -> Result<()> {
    value.encode(buf)
}

/// Decode a `T` from `buf`.
#[inline]
pub fn decode<T: Codec, R: WireRead>(buf: &mut R) -> Result<T> {
    T::decode(buf)
}

/// Encoded size of `value` in bytes.
#[inline]
pub fn encoded_size<T: Codec>(value: &T) -> usize {
    value.encoded_size()
}

/// Encoded size shared by every value of `T`, if `T` is fixed-width.
#[inline]
pub const fn fixed_size<T: Codec>() -> Option<usize> {
    T::FIXED_SIZE
}

/// Encode `value` into a new, exactly sized buffer.
pub fn to_bytes<T: Codec>(value: &T) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(value.encoded_size());
    value.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Decode a `T` that must span all of `bytes`.
///
/// # Errors
///
/// Returns [`WireError::TrailingBytes`] if input remains after the value.
pub fn from_bytes<T: Codec>(bytes: &[u8]) -> Result<T> {
    let mut input = bytes;
    let value = T::decode(&mut input)?;
    if !input.is_empty() {
        return Err(WireError::TrailingBytes(input.len()));
    }
    Ok(value)
}

/// Sum of fixed sizes, `None` as soon as one part is variable.
#[doc(hidden)]
pub const fn sum_fixed_sizes(sizes: &[Option<usize>]) -> Option<usize> {
    let mut total = 0;
    let mut i = 0;
    while i < sizes.len() {
        match sizes[i] {
            Some(size) => total += size,
            None => return None,
        }
        i += 1;
    }
    Some(total)
}

/// `size * count` for fixed-size elements.
#[doc(hidden)]
pub const fn repeat_fixed_size(size: Option<usize>, count: usize) -> Option<usize> {
    match size {
        Some(size) => Some(size * count),
        None => None,
    }
}

/// Fixed size of a tagged sum type: the tag plus a payload size that every
/// alternative shares. `None` when alternatives differ or any is variable.
#[doc(hidden)]
pub const fn uniform_fixed_size(tag_width: usize, variants: &[Option<usize>]) -> Option<usize> {
    if variants.is_empty() {
        return None;
    }
    let first = match variants[0] {
        Some(size) => size,
        None => return None,
    };
    let mut i = 1;
    while i < variants.len() {
        match variants[i] {
            Some(size) if size == first => {}
            _ => return None,
        }
        i += 1;
    }
    Some(tag_width + first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_fixed_size() {
        assert_eq!(uniform_fixed_size(1, &[]), None);
        assert_eq!(uniform_fixed_size(1, &[Some(4), Some(4)]), Some(5));
        assert_eq!(uniform_fixed_size(2, &[Some(0)]), Some(2));
        assert_eq!(uniform_fixed_size(1, &[Some(4), Some(2)]), None);
        assert_eq!(uniform_fixed_size(1, &[Some(4), None]), None);
    }

    #[test]
    fn test_sum_fixed_sizes() {
        assert_eq!(sum_fixed_sizes(&[]), Some(0));
        assert_eq!(sum_fixed_sizes(&[Some(1), Some(4)]), Some(5));
        assert_eq!(sum_fixed_sizes(&[Some(1), None, Some(4)]), None);
    }

    #[test]
    fn test_to_bytes_preallocates_exactly() {
        let bytes = to_bytes(&(0xABCDu16, 7u8)).unwrap();
        assert_eq!(&bytes[..], &[0xAB, 0xCD, 0x07]);
    }

    #[test]
    fn test_from_bytes_rejects_trailing() {
        let err = from_bytes::<u16>(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, WireError::TrailingBytes(1)));
    }

    #[test]
    fn test_from_bytes_short_input() {
        let err = from_bytes::<u32>(&[0, 1]).unwrap_err();
        assert!(matches!(err, WireError::BufferUnderflow { .. }));
    }

    #[test]
    fn test_fixed_size_is_const() {
        const SIZE: Option<usize> = fixed_size::<u64>();
        assert_eq!(SIZE, Some(8));
        assert_eq!(fixed_size::<String>(), None);
    }
}
