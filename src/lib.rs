//! # structwire
//!
//! Deterministic binary serialization for Rust types, and a tagged message
//! protocol built on it.
//!
//! Encoding is driven entirely by the static type: no schema travels on
//! the wire, and the same type decodes exactly what it encoded.
//!
//! ## Wire format
//!
//! - Integers are fixed width, big endian; floats are their IEEE-754 bits
//! - `bool` is one byte, `0` or `1`
//! - Strings, sequences, sets and maps carry a varint element count
//! - Structs are their fields in declaration order, with no padding
//! - Sum types carry a minimal-width tag before the active alternative
//! - Protocol messages carry a minimal-width type index before the payload
//!
//! ## Example
//!
//! ```
//! use structwire::{Codec, Protocol, ProtocolHandler};
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Hello {
//!     name: String,
//! }
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Lobby {
//!     users: Vec<String>,
//! }
//!
//! #[derive(Protocol, Debug, PartialEq)]
//! enum Chat {
//!     Hello(Hello),
//!     Lobby(Lobby),
//! }
//!
//! let protocol = ProtocolHandler::<Chat>::new();
//! let mut wire = Vec::new();
//! protocol.encode_message(&mut wire, &Hello { name: "Ann".into() }).unwrap();
//! assert_eq!(wire, [0, 3, b'A', b'n', b'n']);
//!
//! let message = protocol.decode_message(&mut &wire[..]).unwrap();
//! assert_eq!(message, Chat::Hello(Hello { name: "Ann".into() }));
//! ```

extern crate self as structwire;

pub mod buffer;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

pub use codec::bitset::BitSet;
pub use codec::magic;
pub use codec::varint::{decode_varint, encode_varint, varint_size, VarInt};
pub use codec::{decode, encode, encoded_size, fixed_size, from_bytes, to_bytes, Codec};
pub use error::{ErrorKind, Result, WireError};
pub use protocol::{Dispatch, Handler, HandlerResult, Message, Protocol, ProtocolHandler};

pub use structwire_derive::{Codec, Protocol};

/// Support items for derive-generated code. Not public API.
#[doc(hidden)]
pub mod __private {
    use std::fmt::Display;

    use crate::error::WireError;

    pub use crate::codec::tag::{decode_tag, encode_tag};
    pub use crate::codec::{sum_fixed_sizes, uniform_fixed_size};

    /// Error for a `#[repr]` enum value that names no variant.
    pub fn unknown_discriminant<T: Display>(type_name: &'static str, value: T) -> WireError {
        tracing::debug!("Unknown discriminant {} for {}", value, type_name);
        WireError::InvalidData(format!("unknown discriminant {value} for {type_name}"))
    }
}
