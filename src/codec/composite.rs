//! Arrays, tuples, `Option`, `Box` and zero-sized values.
//!
//! - `[T; N]`: exactly `N` elements, no length prefix
//! - Tuples (up to 12): components in declaration order
//! - `Option<T>`: `bool` presence flag, payload only when present
//! - `Box<T>`: same bytes as `T`
//! - `()` and `PhantomData<T>`: zero bytes
//!
//! Tuple decoding binds every component to a local in order before the
//! tuple is assembled, so component `n` is always read before `n + 1`.

use std::marker::PhantomData;

use crate::buffer::{WireRead, WireWrite};
use crate::codec::{repeat_fixed_size, sum_fixed_sizes, Codec};
use crate::error::{Result, WireError};

impl<T: Codec, const N: usize> Codec for [T; N] {
    const FIXED_SIZE: Option<usize> = repeat_fixed_size(T::FIXED_SIZE, N);

    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode(buf)?);
        }
        items.try_into().map_err(|items: Vec<T>| {
            WireError::InvalidData(format!("decoded {} of {N} array elements", items.len()))
        })
    }

    fn encoded_size(&self) -> usize {
        match Self::FIXED_SIZE {
            Some(size) => size,
            None => self.iter().map(T::encoded_size).sum(),
        }
    }
}

macro_rules! impl_tuple {
    ($($ty:ident $var:ident $idx:tt),+) => {
        impl<$($ty: Codec),+> Codec for ($($ty,)+) {
            const FIXED_SIZE: Option<usize> = sum_fixed_sizes(&[$($ty::FIXED_SIZE),+]);

            fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
                $(self.$idx.encode(buf)?;)+
                Ok(())
            }

            fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
                $(let $var = $ty::decode(buf)?;)+
                Ok(($($var,)+))
            }

            fn encoded_size(&self) -> usize {
                match Self::FIXED_SIZE {
                    Some(size) => size,
                    None => 0 $(+ self.$idx.encoded_size())+,
                }
            }
        }
    };
}

impl_tuple!(A a 0);
impl_tuple!(A a 0, B b 1);
impl_tuple!(A a 0, B b 1, C c 2);
impl_tuple!(A a 0, B b 1, C c 2, D d 3);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7, I i 8);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7, I i 8, J j 9);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7, I i 8, J j 9, K k 10);
impl_tuple!(A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7, I i 8, J j 9, K k 10, L l 11);

impl<T: Codec> Codec for Option<T> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        match self {
            Some(value) => {
                true.encode(buf)?;
                value.encode(buf)
            }
            None => false.encode(buf),
        }
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        if bool::decode(buf)? {
            T::decode(buf).map(Some)
        } else {
            Ok(None)
        }
    }

    fn encoded_size(&self) -> usize {
        1 + self.as_ref().map_or(0, T::encoded_size)
    }
}

impl<T: Codec> Codec for Box<T> {
    const FIXED_SIZE: Option<usize> = T::FIXED_SIZE;

    #[inline]
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        (**self).encode(buf)
    }

    #[inline]
    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        T::decode(buf).map(Box::new)
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        (**self).encoded_size()
    }
}

impl Codec for () {
    const FIXED_SIZE: Option<usize> = Some(0);

    #[inline]
    fn encode<W: WireWrite>(&self, _buf: &mut W) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn decode<R: WireRead>(_buf: &mut R) -> Result<Self> {
        Ok(())
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        0
    }
}

impl<T: ?Sized> Codec for PhantomData<T> {
    const FIXED_SIZE: Option<usize> = Some(0);

    #[inline]
    fn encode<W: WireWrite>(&self, _buf: &mut W) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn decode<R: WireRead>(_buf: &mut R) -> Result<Self> {
        Ok(PhantomData)
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        0
    }
}
