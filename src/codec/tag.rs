//! Tags for sum types and message sets.
//!
//! A tag selects one of `N` alternatives. It is written with the smallest
//! unsigned integer that can enumerate all of them:
//!
//! | alternatives     | tag   |
//! |------------------|-------|
//! | up to 256        | `u8`  |
//! | up to 65 536     | `u16` |
//! | more             | `u32` |
//!
//! Decoding rejects any tag `>= N`; tags are never truncated or wrapped.
//! `#[derive(Codec)]` and `#[derive(Protocol)]` pick the width at compile
//! time and go through the helpers here.

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// Unsigned integer usable as a tag.
pub trait TypeIndex: Codec + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Convert an alternative index, `None` if it does not fit.
    fn from_index(index: usize) -> Option<Self>;

    /// Widen back to an index. Fails only where `usize` is narrower.
    fn to_index(self) -> Option<usize>;
}

macro_rules! impl_type_index {
    ($($ty:ty),*) => {$(
        impl TypeIndex for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn from_index(index: usize) -> Option<Self> {
                <$ty>::try_from(index).ok()
            }

            #[inline]
            fn to_index(self) -> Option<usize> {
                usize::try_from(self).ok()
            }
        }
    )*};
}

impl_type_index!(u8, u16, u32);

/// Bytes needed for the tag of a type with `count` alternatives.
pub const fn index_width(count: usize) -> usize {
    if count <= 1 << 8 {
        1
    } else if count <= 1 << 16 {
        2
    } else {
        4
    }
}

/// Write the tag for alternative `index`.
pub fn encode_tag<I: TypeIndex, W: WireWrite + ?Sized>(buf: &mut W, index: usize) -> Result<()> {
    let tag = I::from_index(index).ok_or_else(|| {
        WireError::InvalidData(format!("alternative {index} does not fit its tag width"))
    })?;
    let mut buf = buf;
    tag.encode(&mut buf)
}

/// Read a raw tag without bounds checking.
pub fn read_tag<I: TypeIndex, R: WireRead + ?Sized>(buf: &mut R) -> Result<Option<usize>> {
    let mut buf = buf;
    Ok(I::decode(&mut buf)?.to_index())
}

/// Read a tag and check it against `count` alternatives of `type_name`.
///
/// # Errors
///
/// Returns [`WireError::InvalidTag`] when the tag is out of range.
pub fn decode_tag<I: TypeIndex, R: WireRead + ?Sized>(
    buf: &mut R,
    count: usize,
    type_name: &'static str,
) -> Result<usize> {
    match read_tag::<I, R>(buf)? {
        Some(index) if index < count => Ok(index),
        raw => {
            let index = raw.unwrap_or(usize::MAX);
            tracing::debug!("Invalid tag {index} for {type_name} ({count} alternatives)");
            Err(WireError::InvalidTag {
                type_name,
                index,
                count,
            })
        }
    }
}

/// `Result` as a two-alternative sum type: tag `0` then the `Ok` value, or
/// tag `1` then the `Err` value.
impl<T: Codec, E: Codec> Codec for std::result::Result<T, E> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        match self {
            Ok(value) => {
                encode_tag::<u8, _>(buf, 0)?;
                value.encode(buf)
            }
            Err(error) => {
                encode_tag::<u8, _>(buf, 1)?;
                error.encode(buf)
            }
        }
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let table: [fn(&mut R) -> Result<Self>; 2] = [
            |buf| T::decode(buf).map(Ok),
            |buf| E::decode(buf).map(Err),
        ];
        let index = decode_tag::<u8, _>(buf, table.len(), "Result")?;
        table[index](buf)
    }

    fn encoded_size(&self) -> usize {
        1 + match self {
            Ok(value) => value.encoded_size(),
            Err(error) => error.encoded_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    #[test]
    fn test_index_width() {
        assert_eq!(index_width(0), 1);
        assert_eq!(index_width(2), 1);
        assert_eq!(index_width(256), 1);
        assert_eq!(index_width(257), 2);
        assert_eq!(index_width(65_536), 2);
        assert_eq!(index_width(65_537), 4);
    }

    #[test]
    fn test_tag_bounds() {
        let mut input = &[1u8, 2][..];
        assert_eq!(decode_tag::<u8, _>(&mut input, 2, "Pair").unwrap(), 1);

        let err = decode_tag::<u8, _>(&mut input, 2, "Pair").unwrap_err();
        assert!(matches!(
            err,
            WireError::InvalidTag {
                type_name: "Pair",
                index: 2,
                count: 2
            }
        ));
        assert!(input.is_empty());
    }

    #[test]
    fn test_wide_tags_are_big_endian() {
        let mut out = Vec::new();
        encode_tag::<u16, _>(&mut out, 300).unwrap();
        assert_eq!(out, vec![0x01, 0x2C]);

        let mut input = &out[..];
        assert_eq!(decode_tag::<u16, _>(&mut input, 301, "Big").unwrap(), 300);
    }

    #[test]
    fn test_tag_too_wide_for_width() {
        let mut out = Vec::new();
        assert!(encode_tag::<u8, _>(&mut out, 256).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_result_codec() {
        let ok: std::result::Result<u16, String> = Ok(0x0102);
        let bytes = to_bytes(&ok).unwrap();
        assert_eq!(&bytes[..], &[0, 1, 2]);
        assert_eq!(from_bytes::<std::result::Result<u16, String>>(&bytes).unwrap(), ok);

        let err: std::result::Result<u16, String> = Err("bad".into());
        let bytes = to_bytes(&err).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes.len(), err.encoded_size());
        assert_eq!(from_bytes::<std::result::Result<u16, String>>(&bytes).unwrap(), err);

        let invalid = from_bytes::<std::result::Result<u8, u8>>(&[2, 0]).unwrap_err();
        assert!(invalid.is_data_error());
    }
}
