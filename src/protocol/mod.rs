//! Protocol module - tagged messages over a shared byte stream.
//!
//! A protocol is a fixed, ordered list of message types. Each message on
//! the wire is prefixed with its position in that list, so the receiver can
//! recover the concrete type without any out-of-band schema:
//!
//! ```text
//! [type index][payload]                   message
//! [length][type index][payload]           framed message
//! ```
//!
//! The index uses the smallest unsigned width that can enumerate all
//! message types (see [`crate::codec::tag`]). An index outside the list is
//! a [`WireError::InvalidMessageType`] data error.
//!
//! Declare a protocol with `#[derive(Protocol)]` on an enum:
//!
//! ```
//! use structwire::{Codec, Protocol, ProtocolHandler};
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Ping(u32);
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Pong(u32);
//!
//! #[derive(Protocol, Debug, PartialEq)]
//! enum PingPong {
//!     Ping(Ping),
//!     Pong(Pong),
//! }
//!
//! let handler = ProtocolHandler::<PingPong>::new();
//! let mut wire = Vec::new();
//! handler.encode_message(&mut wire, &Pong(7)).unwrap();
//! assert_eq!(wire, [1, 0, 0, 0, 7]);
//!
//! let decoded = handler.decode_message(&mut &wire[..]).unwrap();
//! assert_eq!(decoded, PingPong::Pong(Pong(7)));
//! ```

mod dispatch;
mod framing;

pub use dispatch::{Dispatch, Handler, HandlerResult, ProtocolHandler};
pub use framing::{
    decode_length, encode_frame, encode_length, FrameConfig, FrameDecoder, LengthField,
    DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_FRAME_LEN,
};

use crate::buffer::{WireRead, WireWrite};
use crate::codec::tag::{read_tag, TypeIndex};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// A fixed, ordered set of message types.
///
/// Implemented by `#[derive(Protocol)]`. The enum itself is the sum of all
/// message types, and its [`Codec`] writes the type index then the payload.
pub trait Protocol: Codec {
    /// Type index integer, the smallest that fits `MESSAGE_COUNT`.
    type Index: TypeIndex;

    /// Number of message types.
    const MESSAGE_COUNT: usize;

    /// Message type names in index order.
    const MESSAGE_NAMES: &'static [&'static str];

    /// Index of the message held by `self`.
    fn message_index(&self) -> usize;

    /// Encode the held message without its type index.
    fn encode_payload<W: WireWrite>(&self, buf: &mut W) -> Result<()>;

    /// Encoded size of the held message without its type index.
    fn payload_size(&self) -> usize;

    /// Decode the payload of message type `index`.
    fn decode_payload<R: WireRead>(index: usize, buf: &mut R) -> Result<Self>;

    /// Name of the message type held by `self`.
    fn message_name(&self) -> &'static str {
        Self::MESSAGE_NAMES
            .get(self.message_index())
            .copied()
            .unwrap_or("<unknown>")
    }
}

/// A message type belonging to protocol `P`.
///
/// `INDEX` is fixed at compile time, so encoding a message never searches
/// the type list. Encoding a type outside `P` does not compile.
pub trait Message<P: Protocol>: Codec {
    /// Position of this type in the protocol's type list.
    const INDEX: usize;

    /// Wrap into the protocol's sum type.
    fn into_message(self) -> P;
}

/// Read a type index and check it against `P`'s message count.
///
/// Nothing beyond the index is consumed when the check fails.
pub fn read_message_index<P: Protocol, R: WireRead + ?Sized>(buf: &mut R) -> Result<usize> {
    match read_tag::<P::Index, R>(buf)? {
        Some(index) if index < P::MESSAGE_COUNT => Ok(index),
        raw => {
            let index = raw.unwrap_or(usize::MAX);
            tracing::debug!(
                "Invalid message type {} (protocol declares {})",
                index,
                P::MESSAGE_COUNT
            );
            Err(WireError::InvalidMessageType {
                index,
                count: P::MESSAGE_COUNT,
            })
        }
    }
}
