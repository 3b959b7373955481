//! Magic numbers: constants written on encode and verified on decode.
//!
//! Each `ConstXX<V>` is a zero-sized type carrying one constant in its type.
//! It encodes exactly like the underlying primitive holding `V`, and decoding
//! fails with [`WireError::MagicMismatch`] unless the stream holds `V`.
//!
//! A multi-part signature is a tuple of constants, so heterogeneous widths
//! mix freely:
//!
//! ```
//! use structwire::magic::{ConstU16, ConstU8};
//!
//! type Signature = (ConstU8<b'S'>, ConstU8<b'W'>, ConstU16<0x0100>);
//!
//! let bytes = structwire::to_bytes(&Signature::default()).unwrap();
//! assert_eq!(&bytes[..], b"SW\x01\x00");
//!
//! assert!(structwire::from_bytes::<Signature>(b"SW\x02\x00").is_err());
//! ```

use std::fmt;
use std::mem::size_of;

use crate::buffer::{WireRead, WireWrite};
use crate::codec::Codec;
use crate::error::{Result, WireError};

fn mismatch<T: fmt::Debug>(type_name: &'static str, expected: T, found: T) -> WireError {
    tracing::debug!("{type_name}: expected magic {expected:?}, found {found:?}");
    WireError::MagicMismatch {
        expected: format!("{expected:?}"),
        found: format!("{found:?}"),
    }
}

macro_rules! const_magic {
    ($($(#[$meta:meta])* $name:ident($ty:ty)),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name<const V: $ty>;

        impl<const V: $ty> $name<V> {
            /// The constant carried by this type.
            pub const VALUE: $ty = V;

            /// The constant carried by this type.
            #[inline]
            pub const fn value(self) -> $ty {
                V
            }
        }

        impl<const V: $ty> fmt::Debug for $name<V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "<{:?}>"), V)
            }
        }

        impl<const V: $ty> Codec for $name<V> {
            const FIXED_SIZE: Option<usize> = Some(size_of::<$ty>());

            #[inline]
            fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
                V.encode(buf)
            }

            fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
                let found = <$ty>::decode(buf)?;
                if found != V {
                    return Err(mismatch(stringify!($name), V, found));
                }
                Ok(Self)
            }

            #[inline]
            fn encoded_size(&self) -> usize {
                size_of::<$ty>()
            }
        }
    )*};
}

const_magic! {
    /// A constant `u8`, e.g. one signature byte.
    ConstU8(u8),
    /// A constant big-endian `u16`.
    ConstU16(u16),
    /// A constant big-endian `u32`.
    ConstU32(u32),
    /// A constant big-endian `u64`.
    ConstU64(u64),
    /// A constant `i8`.
    ConstI8(i8),
    /// A constant big-endian `i16`.
    ConstI16(i16),
    /// A constant big-endian `i32`.
    ConstI32(i32),
    /// A constant big-endian `i64`.
    ConstI64(i64),
    /// A constant `char`.
    ConstChar(char),
    /// A constant `bool`.
    ConstBool(bool),
}
