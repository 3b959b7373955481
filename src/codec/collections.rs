//! Length-prefixed collections.
//!
//! Every collection is a varint element count followed by the elements in
//! iteration order. Maps write each entry as key then value. Decoding
//! inserts elements in the order they were read.
//!
//! Strings and [`Bytes`] count bytes rather than elements; strings must be
//! valid UTF-8.
//!
//! The count read from the wire is untrusted: up-front allocation is capped
//! and the rest grows as elements actually arrive.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};

use bytes::Bytes;

use crate::buffer::{underflow, WireRead, WireWrite};
use crate::codec::varint::{decode_len, encode_len, len_size};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// Upper bound on elements reserved before any of them is decoded.
const MAX_PREALLOC_ELEMENTS: usize = 4096;

/// Chunk size for reading byte strings.
const READ_CHUNK: usize = 8 * 1024;

#[inline]
fn prealloc(count: usize) -> usize {
    count.min(MAX_PREALLOC_ELEMENTS)
}

/// Size of `count` items: multiplied out for fixed-size items, summed otherwise.
fn items_size<'a, T: Codec + 'a>(count: usize, items: impl Iterator<Item = &'a T>) -> usize {
    len_size(count)
        + match T::FIXED_SIZE {
            Some(size) => size * count,
            None => items.map(T::encoded_size).sum(),
        }
}

fn read_byte_vec<R: WireRead + ?Sized>(buf: &mut R, len: usize) -> Result<Vec<u8>> {
    if let Some(available) = buf.remaining_hint() {
        if available < len {
            return Err(underflow(len, available));
        }
    }

    let mut out = Vec::with_capacity(len.min(READ_CHUNK * 8));
    let mut chunk = [0u8; READ_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(READ_CHUNK);
        buf.read_bytes(&mut chunk[..n])?;
        out.extend_from_slice(&chunk[..n]);
        remaining -= n;
    }
    Ok(out)
}

impl<T: Codec> Codec for Vec<T> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        let mut out = Vec::with_capacity(prealloc(count));
        for _ in 0..count {
            out.push(T::decode(buf)?);
        }
        Ok(out)
    }

    fn encoded_size(&self) -> usize {
        items_size(self.len(), self.iter())
    }
}

impl<T: Codec> Codec for VecDeque<T> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        let mut out = VecDeque::with_capacity(prealloc(count));
        for _ in 0..count {
            out.push_back(T::decode(buf)?);
        }
        Ok(out)
    }

    fn encoded_size(&self) -> usize {
        items_size(self.len(), self.iter())
    }
}

impl<T: Codec> Codec for LinkedList<T> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        (0..count).map(|_| T::decode(&mut *buf)).collect()
    }

    fn encoded_size(&self) -> usize {
        items_size(self.len(), self.iter())
    }
}

impl<T: Codec + Ord> Codec for BTreeSet<T> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        (0..count).map(|_| T::decode(&mut *buf)).collect()
    }

    fn encoded_size(&self) -> usize {
        items_size(self.len(), self.iter())
    }
}

impl<T, S> Codec for HashSet<T, S>
where
    T: Codec + Eq + Hash,
    S: BuildHasher + Default,
{
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        self.iter().try_for_each(|item| item.encode(buf))
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        let mut out = HashSet::with_capacity_and_hasher(prealloc(count), S::default());
        for _ in 0..count {
            out.insert(T::decode(buf)?);
        }
        Ok(out)
    }

    fn encoded_size(&self) -> usize {
        items_size(self.len(), self.iter())
    }
}

fn entries_size<'a, K, V>(count: usize, entries: impl Iterator<Item = (&'a K, &'a V)>) -> usize
where
    K: Codec + 'a,
    V: Codec + 'a,
{
    len_size(count)
        + match (K::FIXED_SIZE, V::FIXED_SIZE) {
            (Some(k), Some(v)) => (k + v) * count,
            _ => entries
                .map(|(k, v)| k.encoded_size() + v.encoded_size())
                .sum(),
        }
}

impl<K: Codec + Ord, V: Codec> Codec for BTreeMap<K, V> {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        for (key, value) in self {
            key.encode(buf)?;
            value.encode(buf)?;
        }
        Ok(())
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        let mut out = BTreeMap::new();
        for _ in 0..count {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            out.insert(key, value);
        }
        Ok(out)
    }

    fn encoded_size(&self) -> usize {
        entries_size(self.len(), self.iter())
    }
}

impl<K, V, S> Codec for HashMap<K, V, S>
where
    K: Codec + Eq + Hash,
    V: Codec,
    S: BuildHasher + Default,
{
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        for (key, value) in self {
            key.encode(buf)?;
            value.encode(buf)?;
        }
        Ok(())
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let count = decode_len(buf)?;
        let mut out = HashMap::with_capacity_and_hasher(prealloc(count), S::default());
        for _ in 0..count {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            out.insert(key, value);
        }
        Ok(out)
    }

    fn encoded_size(&self) -> usize {
        entries_size(self.len(), self.iter())
    }
}

impl Codec for String {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        buf.write_bytes(self.as_bytes())
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let len = decode_len(buf)?;
        let bytes = read_byte_vec(buf, len)?;
        String::from_utf8(bytes)
            .map_err(|e| WireError::InvalidData(format!("string is not valid UTF-8: {e}")))
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        len_size(self.len()) + self.len()
    }
}

impl Codec for Bytes {
    fn encode<W: WireWrite>(&self, buf: &mut W) -> Result<()> {
        encode_len(buf, self.len())?;
        buf.write_bytes(self)
    }

    fn decode<R: WireRead>(buf: &mut R) -> Result<Self> {
        let len = decode_len(buf)?;
        read_byte_vec(buf, len).map(Bytes::from)
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        len_size(self.len()) + self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    fn check<T: Codec + PartialEq + std::fmt::Debug>(value: T) -> Bytes {
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(bytes.len(), value.encoded_size());
        assert_eq!(from_bytes::<T>(&bytes).unwrap(), value);
        bytes
    }

    #[test]
    fn test_string_layout() {
        let bytes = check(String::from("Ann"));
        assert_eq!(&bytes[..], &[3, b'A', b'n', b'n']);
        check(String::new());
        check("\u{1F980} crab".to_string());
    }

    #[test]
    fn test_long_string_uses_multibyte_length() {
        let long = "x".repeat(300);
        let bytes = check(long);
        assert_eq!(&bytes[..2], &[0x82, 0x2C]);
        assert_eq!(bytes.len(), 302);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = from_bytes::<String>(&[2, 0xC3, 0x28]).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_vec_of_strings() {
        let bytes = check(vec!["Ann".to_string(), "Bob".to_string()]);
        assert_eq!(bytes[0], 2);
        check(Vec::<String>::new());
    }

    #[test]
    fn test_vec_fixed_size_elements() {
        let bytes = check(vec![0xABCDu16, 1, 2]);
        assert_eq!(&bytes[..], &[3, 0xAB, 0xCD, 0, 1, 0, 2]);
    }

    #[test]
    fn test_nested_sequences() {
        check(vec![vec![1u8, 2], vec![], vec![3]]);
        check(VecDeque::from(vec![-1i64, 0, i64::MAX]));
        check(LinkedList::from([1.5f32, -0.25]));
    }

    #[test]
    fn test_duplicates_preserved() {
        let bytes = check(vec![7u32, 7, 7]);
        assert_eq!(bytes[0], 3);
    }

    #[test]
    fn test_ordered_containers() {
        check(BTreeSet::from([3u16, 1, 2]));

        let mut scores = BTreeMap::new();
        scores.insert("Ann".to_string(), 42u64);
        scores.insert("Bob".to_string(), 7u64);
        let bytes = check(scores);
        // count, then "Ann" (sorted first) and its score
        assert_eq!(&bytes[..5], &[2, 3, b'A', b'n', b'n']);
    }

    #[test]
    fn test_hash_containers() {
        check(HashSet::from([10u8, 20, 30]));
        check(HashMap::from([(1u32, "one".to_string()), (2, "two".to_string())]));
        check(HashMap::<u8, u8>::new());
    }

    #[test]
    fn test_bytes_codec() {
        let bytes = check(Bytes::from_static(b"\x00\x01\xFF"));
        assert_eq!(&bytes[..], &[3, 0x00, 0x01, 0xFF]);
    }

    #[test]
    fn test_oversized_count_fails_without_allocating() {
        // Claims u32::MAX elements but carries none.
        let mut wire = Vec::new();
        crate::codec::varint::encode_varint(&mut wire, u64::from(u32::MAX)).unwrap();

        let err = from_bytes::<Vec<u64>>(&wire).unwrap_err();
        assert!(matches!(err, WireError::BufferUnderflow { .. }));

        let err = from_bytes::<String>(&wire).unwrap_err();
        assert!(matches!(err, WireError::BufferUnderflow { .. }));
    }

    #[test]
    fn test_truncated_element() {
        let err = from_bytes::<Vec<u16>>(&[2, 0, 1, 0]).unwrap_err();
        assert!(matches!(err, WireError::BufferUnderflow { .. }));
    }
}
