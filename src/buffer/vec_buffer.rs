//! Growable in-memory buffer with a read cursor.
//!
//! Bytes are appended at the back and consumed from the front. Consumed
//! bytes stay in memory until the buffer is trimmed, either explicitly with
//! [`VecBuffer::trim`] or automatically according to its [`TrimPolicy`].
//!
//! # Example
//!
//! ```
//! use structwire::buffer::{TrimPolicy, VecBuffer};
//!
//! let mut buffer = VecBuffer::with_trim_policy(TrimPolicy::Always);
//! structwire::encode(&mut buffer, &0xABCDu16).unwrap();
//! assert_eq!(buffer.available_bytes(), 2);
//!
//! let value: u16 = structwire::decode(&mut buffer).unwrap();
//! assert_eq!(value, 0xABCD);
//! assert_eq!(buffer.consumed_bytes(), 0); // trimmed right after the read
//! ```

use bytes::{Buf, Bytes, BytesMut};

use super::{underflow, WireRead, WireWrite};
use crate::error::Result;

/// Default threshold for [`TrimPolicy::Threshold`] (4 KB).
pub const DEFAULT_TRIM_THRESHOLD: usize = 4 * 1024;

/// When consumed bytes are dropped from the front of a [`VecBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimPolicy {
    /// Only [`VecBuffer::trim`] drops consumed bytes.
    Manual,
    /// Drop consumed bytes after every successful read.
    Always,
    /// Drop consumed bytes once at least this many have accumulated.
    Threshold(usize),
}

impl Default for TrimPolicy {
    fn default() -> Self {
        TrimPolicy::Threshold(DEFAULT_TRIM_THRESHOLD)
    }
}

/// In-memory byte buffer implementing both sides of the wire contract.
#[derive(Debug, Clone, Default)]
pub struct VecBuffer {
    /// Written bytes, including the consumed prefix.
    data: BytesMut,
    /// Start of the unread region within `data`.
    read_offset: usize,
    policy: TrimPolicy,
}

impl VecBuffer {
    /// Create an empty buffer with the default trim policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read_offset: 0,
            policy: TrimPolicy::default(),
        }
    }

    /// Create an empty buffer with a custom trim policy.
    pub fn with_trim_policy(policy: TrimPolicy) -> Self {
        Self {
            data: BytesMut::new(),
            read_offset: 0,
            policy,
        }
    }

    /// Builder-style setter for the trim policy.
    pub fn trim_policy(mut self, policy: TrimPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current trim policy.
    #[inline]
    pub fn policy(&self) -> TrimPolicy {
        self.policy
    }

    /// Number of written but not yet read bytes.
    #[inline]
    pub fn available_bytes(&self) -> usize {
        self.data.len() - self.read_offset
    }

    /// Number of read bytes still held in memory.
    #[inline]
    pub fn consumed_bytes(&self) -> usize {
        self.read_offset
    }

    /// Check if there is nothing left to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available_bytes() == 0
    }

    /// The unread bytes.
    #[inline]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.read_offset..]
    }

    /// Total allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Reserve room for at least `additional` more written bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    /// Append raw bytes, e.g. data received from a socket.
    pub fn extend_from_slice(&mut self, src: &[u8]) {
        self.data.extend_from_slice(src);
    }

    /// Drop the consumed prefix.
    pub fn trim(&mut self) {
        if self.read_offset > 0 {
            self.data.advance(self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Remove all bytes, read or not.
    pub fn clear(&mut self) {
        self.data.clear();
        self.read_offset = 0;
    }

    /// Take all unread bytes out of the buffer without copying.
    ///
    /// The buffer is empty afterwards.
    pub fn split_unread(&mut self) -> Bytes {
        self.trim();
        self.data.split().freeze()
    }

    fn consume(&mut self, n: usize) {
        self.read_offset += n;
        let trim = match self.policy {
            TrimPolicy::Manual => false,
            TrimPolicy::Always => true,
            TrimPolicy::Threshold(limit) => self.read_offset >= limit,
        };
        if trim {
            self.trim();
        }
    }
}

impl WireRead for VecBuffer {
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        let available = self.available_bytes();
        if available < dst.len() {
            return Err(underflow(dst.len(), available));
        }
        let start = self.read_offset;
        dst.copy_from_slice(&self.data[start..start + dst.len()]);
        self.consume(dst.len());
        Ok(())
    }

    fn try_read_bytes(&mut self, dst: &mut [u8]) -> Result<bool> {
        if self.available_bytes() < dst.len() {
            return Ok(false);
        }
        self.read_bytes(dst)?;
        Ok(true)
    }

    #[inline]
    fn remaining_hint(&self) -> Option<usize> {
        Some(self.available_bytes())
    }
}

impl WireWrite for VecBuffer {
    #[inline]
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.data.extend_from_slice(src);
        Ok(())
    }
}

impl From<Vec<u8>> for VecBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&bytes[..]),
            read_offset: 0,
            policy: TrimPolicy::default(),
        }
    }
}
