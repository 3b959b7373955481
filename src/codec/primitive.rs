//! Primitive codecs.
//!
//! - Multi-byte integers: big endian, most significant byte first
//! - Signed integers: two's complement bytes on the wire; decoding maps the
//!   raw unsigned value back through a bias so no narrowing cast is involved
//! - Floats: IEEE-754 bit pattern, big endian
//! - `bool`: one byte, `0` or `1`; anything else is a data error
//! - `char`: 32-bit big endian Unicode scalar value

use std::mem::size_of;

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

impl Codec for u8 {
    const FIXED_SIZE: Option<usize> = Some(1);

    #[inline]
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        buf.write_u8(*self)
    }

    #[inline]
    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        buf.read_u8()
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        1
    }
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Codec for $ty {
            const FIXED_SIZE: Option<usize> = Some(size_of::<$ty>());

            #[inline]
            fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
                buf.write_bytes(&self.to_be_bytes())
            }

            #[inline]
            fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
                let raw = buf.read_array::<{ size_of::<$ty>() }>()?;
                Ok(<$ty>::from_be_bytes(raw))
            }

            #[inline]
            fn encoded_size(&self) -> usize {
                size_of::<$ty>()
            }
        }
    )*};
}

impl_unsigned!(u16, u32, u64, u128);

macro_rules! impl_signed {
    ($($ty:ty => $unsigned:ty),*) => {$(
        impl Codec for $ty {
            const FIXED_SIZE: Option<usize> = Some(size_of::<$ty>());

            #[inline]
            fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
                buf.write_bytes(&self.to_be_bytes())
            }

            fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
                let raw = <$unsigned>::decode(buf)?;
                // Raw values below the bias are the non-negative range; the
                // rest are shifted down by the bias and offset from MIN.
                let bias = <$ty>::MIN.unsigned_abs();
                let value = if raw < bias {
                    <$ty>::try_from(raw).ok()
                } else {
                    <$ty>::try_from(raw - bias)
                        .ok()
                        .and_then(|v| v.checked_add(<$ty>::MIN))
                };
                value.ok_or_else(|| {
                    WireError::InvalidData(format!(
                        "value {raw:#x} not representable as {}",
                        stringify!($ty)
                    ))
                })
            }

            #[inline]
            fn encoded_size(&self) -> usize {
                size_of::<$ty>()
            }
        }
    )*};
}

impl_signed!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, i128 => u128);

macro_rules! impl_float {
    ($($ty:ty => $bits:ty),*) => {$(
        impl Codec for $ty {
            const FIXED_SIZE: Option<usize> = Some(size_of::<$ty>());

            #[inline]
            fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
                self.to_bits().encode(buf)
            }

            #[inline]
            fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
                Ok(<$ty>::from_bits(<$bits>::decode(buf)?))
            }

            #[inline]
            fn encoded_size(&self) -> usize {
                size_of::<$ty>()
            }
        }
    )*};
}

impl_float!(f32 => u32, f64 => u64);

impl Codec for bool {
    const FIXED_SIZE: Option<usize> = Some(1);

    #[inline]
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        buf.write_u8(u8::from(*self))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        match buf.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidData(format!(
                "invalid bool byte {other:#04x}"
            ))),
        }
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        1
    }
}

impl Codec for char {
    const FIXED_SIZE: Option<usize> = Some(4);

    #[inline]
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        u32::from(*self).encode(buf)
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let scalar = u32::decode(buf)?;
        char::from_u32(scalar).ok_or_else(|| {
            WireError::InvalidData(format!("{scalar:#x} is not a Unicode scalar value"))
        })
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    fn round_trip<T: Codec + PartialEq + std::fmt::Debug>(value: T) {
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes.len(), value.encoded_size());
        assert_eq!(Some(bytes.len()), T::FIXED_SIZE);
        assert_eq!(from_bytes::<T>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_big_endian_u16() {
        assert_eq!(&to_bytes(&0xABCDu16).unwrap()[..], &[0xAB, 0xCD]);
    }

    #[test]
    fn test_big_endian_wider() {
        assert_eq!(
            &to_bytes(&0xABCDEF12u32).unwrap()[..],
            &[0xAB, 0xCD, 0xEF, 0x12]
        );
        assert_eq!(
            &to_bytes(&0xABCDEF1234567890u64).unwrap()[..],
            &[0xAB, 0xCD, 0xEF, 0x12, 0x34, 0x56, 0x78, 0x90]
        );
    }

    #[test]
    fn test_signed_twos_complement_bytes() {
        assert_eq!(&to_bytes(&-1i16).unwrap()[..], &[0xFF, 0xFF]);
        assert_eq!(&to_bytes(&i32::MIN).unwrap()[..], &[0x80, 0, 0, 0]);
        assert_eq!(&to_bytes(&-0x7CDEi16).unwrap()[..], &[0x83, 0x22]);
    }

    #[test]
    fn test_integer_boundaries() {
        for v in [u8::MIN, 1, 0xAB, u8::MAX] {
            round_trip(v);
        }
        for v in [i8::MIN, -1, 0, 1, -0x7C, i8::MAX] {
            round_trip(v);
        }
        for v in [u16::MIN, 1, 0xABCD, u16::MAX] {
            round_trip(v);
        }
        for v in [i16::MIN, -1, 0, 1, -0x7CDE, i16::MAX] {
            round_trip(v);
        }
        for v in [u32::MIN, 1, 0xABCDEF12, u32::MAX] {
            round_trip(v);
        }
        for v in [i32::MIN, -1, 0, 1, -0x7CDEF123, i32::MAX] {
            round_trip(v);
        }
        for v in [u64::MIN, 1, 0xABCDEF1234567890, u64::MAX] {
            round_trip(v);
        }
        for v in [i64::MIN, -1, 0, 1, -0x7CDEF123456789AB, i64::MAX] {
            round_trip(v);
        }
        for v in [u128::MIN, u128::MAX] {
            round_trip(v);
        }
        for v in [i128::MIN, -1, 0, i128::MAX] {
            round_trip(v);
        }
    }

    #[test]
    fn test_float_bytes_are_big_endian_ieee() {
        // 1.0f32 = 0x3F800000
        assert_eq!(&to_bytes(&1.0f32).unwrap()[..], &[0x3F, 0x80, 0x00, 0x00]);
        // -2.0f64 = 0xC000000000000000
        assert_eq!(
            &to_bytes(&-2.0f64).unwrap()[..],
            &[0xC0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_float_round_trips() {
        for v in [
            123.456f32,
            0.00001,
            -123.456,
            12300000.0001,
            1e20,
            -420000000.0000234,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::INFINITY,
        ] {
            round_trip(v);
        }
        for v in [
            23456.67891f64,
            -456.6789123,
            0.0000000000001,
            1e200,
            -42e42,
            f64::MIN_POSITIVE,
            f64::MIN_POSITIVE / 2.0,
            f64::MAX,
        ] {
            round_trip(v);
        }
    }

    #[test]
    fn test_nan_preserves_bits() {
        let nan = f64::from_bits(0x7FF8_0000_0000_0001);
        let back: f64 = from_bytes(&to_bytes(&nan).unwrap()).unwrap();
        assert_eq!(back.to_bits(), nan.to_bits());
    }

    #[test]
    fn test_bool() {
        round_trip(true);
        round_trip(false);
        assert_eq!(&to_bytes(&true).unwrap()[..], &[1]);

        let err = from_bytes::<bool>(&[2]).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_char() {
        round_trip('A');
        round_trip('\u{1F980}');
        assert_eq!(&to_bytes(&'A').unwrap()[..], &[0, 0, 0, 0x41]);

        // Surrogate code point.
        let err = from_bytes::<char>(&[0, 0, 0xD8, 0x00]).unwrap_err();
        assert!(err.is_data_error());
    }
}
