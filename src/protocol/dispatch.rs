//! Message handlers and the protocol handler.
//!
//! [`ProtocolHandler`] encodes messages with their type index and decodes
//! them back, either into the protocol's sum type ([`ProtocolHandler::decode_message`])
//! or straight into a handler ([`ProtocolHandler::process_message`]).
//!
//! Dispatch goes through a table with one function per message type,
//! indexed by the type index after the bounds check. The table is built
//! per (reader, handler) pairing by the `Dispatch` impl that
//! `#[derive(Protocol)]` generates.
//!
//! # Example
//!
//! ```
//! use structwire::{Codec, Handler, HandlerResult, Protocol, ProtocolHandler};
//!
//! #[derive(Codec)]
//! struct Join(String);
//!
//! #[derive(Codec)]
//! struct Leave(String);
//!
//! #[derive(Protocol)]
//! enum Presence {
//!     Join(Join),
//!     Leave(Leave),
//! }
//!
//! #[derive(Default)]
//! struct Roster(Vec<String>);
//!
//! impl Handler<Join> for Roster {
//!     fn handle(&mut self, message: Join) -> HandlerResult {
//!         self.0.push(message.0);
//!         Ok(())
//!     }
//! }
//!
//! impl Handler<Leave> for Roster {
//!     fn handle(&mut self, message: Leave) -> HandlerResult {
//!         self.0.retain(|name| *name != message.0);
//!         Ok(())
//!     }
//! }
//!
//! let protocol = ProtocolHandler::<Presence>::new();
//! let mut wire = Vec::new();
//! protocol.encode_message(&mut wire, &Join("ann".into())).unwrap();
//! protocol.encode_message(&mut wire, &Join("bob".into())).unwrap();
//! protocol.encode_message(&mut wire, &Leave("ann".into())).unwrap();
//!
//! let mut roster = Roster::default();
//! let mut input = &wire[..];
//! while !input.is_empty() {
//!     protocol.process_message(&mut input, &mut roster).unwrap();
//! }
//! assert_eq!(roster.0, ["bob"]);
//! ```

use std::fmt;
use std::marker::PhantomData;

use super::framing::{encode_length, LengthField};
use super::{read_message_index, Message, Protocol};
use crate::buffer::{WireRead, WireWrite};
use crate::codec::tag::{encode_tag, TypeIndex};
use crate::codec::Codec;
use crate::error::{Result, WireError};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Handles one message type.
///
/// A handler for a whole protocol implements `Handler<M>` for every
/// message type `M`; a missing impl is a compile error at the
/// `process_message` call site.
pub trait Handler<M> {
    /// Handle a decoded message.
    fn handle(&mut self, message: M) -> HandlerResult;
}

/// Decode a payload by type index and pass it to a handler.
///
/// Implemented by `#[derive(Protocol)]` for every handler type that
/// handles all of the protocol's message types.
pub trait Dispatch<H>: Protocol {
    /// Decode the payload of message type `index` and hand it to `handler`.
    fn dispatch<R: WireRead>(index: usize, buf: &mut R, handler: &mut H) -> Result<()>;
}

/// Encodes, decodes and dispatches the messages of protocol `P`.
///
/// Stateless: every call is independent, and one handler can serve any
/// number of streams.
pub struct ProtocolHandler<P> {
    _protocol: PhantomData<fn() -> P>,
}

impl<P: Protocol> ProtocolHandler<P> {
    /// Create a handler.
    pub const fn new() -> Self {
        Self {
            _protocol: PhantomData,
        }
    }

    /// Write `message` with its type index.
    pub fn encode_message<M, W>(&self, buf: &mut W, message: &M) -> Result<()>
    where
        M: Message<P>,
        W: WireWrite,
    {
        encode_tag::<P::Index, W>(buf, M::INDEX)?;
        message.encode(buf)
    }

    /// Write an already wrapped message with its type index.
    pub fn encode_any<W: WireWrite>(&self, buf: &mut W, message: &P) -> Result<()> {
        message.encode(buf)
    }

    /// Encoded size of `message` including its type index.
    pub fn message_size<M: Message<P>>(&self, message: &M) -> usize {
        <P::Index as TypeIndex>::WIDTH + message.encoded_size()
    }

    /// Read one message into the protocol's sum type.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidMessageType`] if the type index is out of
    /// range, in which case nothing after the index has been read.
    pub fn decode_message<R: WireRead>(&self, buf: &mut R) -> Result<P> {
        let index = read_message_index::<P, R>(buf)?;
        P::decode_payload(index, buf)
    }

    /// Read one message and pass it to the matching `Handler` impl.
    ///
    /// Handler errors are returned unchanged.
    pub fn process_message<R, H>(&self, buf: &mut R, handler: &mut H) -> Result<()>
    where
        R: WireRead,
        P: Dispatch<H>,
    {
        let index = read_message_index::<P, R>(buf)?;
        if let Some(name) = P::MESSAGE_NAMES.get(index) {
            tracing::trace!("Dispatching {} message", name);
        }
        P::dispatch(index, buf, handler)
    }

    /// Write `message` as a frame: `L` length prefix, type index, payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MessageLengthOverflow`] before writing anything
    /// if the tagged message does not fit in `L`.
    pub fn encode_framed<L, M, W>(&self, buf: &mut W, message: &M) -> Result<()>
    where
        L: LengthField,
        M: Message<P>,
        W: WireWrite,
    {
        encode_length::<L, W>(buf, self.message_size(message))?;
        self.encode_message(buf, message)
    }

    /// Decode the single message that makes up a frame body.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TrailingBytes`] if the body holds more than
    /// one message.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<P> {
        let mut input = frame;
        let message = self.decode_message(&mut input)?;
        ensure_consumed(input)?;
        Ok(message)
    }

    /// Dispatch the single message that makes up a frame body.
    pub fn process_frame<H>(&self, frame: &[u8], handler: &mut H) -> Result<()>
    where
        P: Dispatch<H>,
    {
        let mut input = frame;
        self.process_message(&mut input, handler)?;
        ensure_consumed(input)
    }
}

fn ensure_consumed(rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(WireError::TrailingBytes(rest.len()))
    }
}

impl<P: Protocol> Default for ProtocolHandler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ProtocolHandler<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for ProtocolHandler<P> {}

impl<P> fmt::Debug for ProtocolHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolHandler")
            .field("protocol", &std::any::type_name::<P>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Codec;

    #[derive(Codec, Debug, PartialEq)]
    struct Hello {
        name: String,
    }

    #[derive(Codec, Debug, PartialEq)]
    struct Lobby {
        users: Vec<String>,
    }

    #[derive(crate::Protocol, Debug, PartialEq)]
    enum Chat {
        Hello(Hello),
        Lobby(Lobby),
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        reject_lobby: bool,
    }

    impl Handler<Hello> for Recorder {
        fn handle(&mut self, message: Hello) -> HandlerResult {
            self.seen.push(format!("hello:{}", message.name));
            Ok(())
        }
    }

    impl Handler<Lobby> for Recorder {
        fn handle(&mut self, message: Lobby) -> HandlerResult {
            if self.reject_lobby {
                return Err(WireError::Handler("lobby closed".into()));
            }
            self.seen.push(format!("lobby:{}", message.users.join(",")));
            Ok(())
        }
    }

    fn hello(name: &str) -> Hello {
        Hello { name: name.into() }
    }

    #[test]
    fn test_protocol_metadata() {
        assert_eq!(<Chat as Protocol>::MESSAGE_COUNT, 2);
        assert_eq!(<Chat as Protocol>::MESSAGE_NAMES, &["Hello", "Lobby"]);
        assert_eq!(<Hello as Message<Chat>>::INDEX, 0);
        assert_eq!(<Lobby as Message<Chat>>::INDEX, 1);
        assert_eq!(Chat::from(hello("x")).message_name(), "Hello");
    }

    #[test]
    fn test_encode_message_layout() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();

        protocol.encode_message(&mut wire, &hello("Ann")).unwrap();

        assert_eq!(wire, [0, 3, b'A', b'n', b'n']);
        assert_eq!(protocol.message_size(&hello("Ann")), wire.len());
    }

    #[test]
    fn test_encode_any_matches_encode_message() {
        let protocol = ProtocolHandler::<Chat>::new();
        let lobby = Lobby {
            users: vec!["Ann".into()],
        };

        let mut direct = Vec::new();
        protocol.encode_message(&mut direct, &lobby).unwrap();

        let mut wrapped = Vec::new();
        protocol.encode_any(&mut wrapped, &lobby.into_message()).unwrap();

        assert_eq!(direct, wrapped);
    }

    #[test]
    fn test_decode_message() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();
        protocol.encode_message(&mut wire, &hello("Ann")).unwrap();

        let mut input = &wire[..];
        let decoded = protocol.decode_message(&mut input).unwrap();

        assert_eq!(decoded, Chat::Hello(hello("Ann")));
        assert!(input.is_empty());
    }

    #[test]
    fn test_invalid_type_index_consumes_only_index() {
        let protocol = ProtocolHandler::<Chat>::new();
        let wire = [2u8, 3, b'A', b'n', b'n'];
        let mut input = &wire[..];

        let err = protocol.decode_message(&mut input).unwrap_err();

        assert!(matches!(
            err,
            WireError::InvalidMessageType { index: 2, count: 2 }
        ));
        assert!(err.is_data_error());
        assert_eq!(input.len(), 4);
    }

    #[test]
    fn test_process_message_dispatches_by_type() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();
        protocol.encode_message(&mut wire, &hello("Ann")).unwrap();
        protocol
            .encode_message(
                &mut wire,
                &Lobby {
                    users: vec!["Ann".into(), "Bob".into()],
                },
            )
            .unwrap();

        let mut recorder = Recorder::default();
        let mut input = &wire[..];
        protocol.process_message(&mut input, &mut recorder).unwrap();
        protocol.process_message(&mut input, &mut recorder).unwrap();

        assert_eq!(recorder.seen, ["hello:Ann", "lobby:Ann,Bob"]);
        assert!(input.is_empty());
    }

    #[test]
    fn test_handler_error_propagates() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();
        protocol
            .encode_message(&mut wire, &Lobby { users: vec![] })
            .unwrap();

        let mut recorder = Recorder {
            reject_lobby: true,
            ..Default::default()
        };
        let err = protocol
            .process_message(&mut &wire[..], &mut recorder)
            .unwrap_err();

        assert!(matches!(err, WireError::Handler(_)));
    }

    #[test]
    fn test_framed_round_trip() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();
        protocol
            .encode_framed::<u16, _, _>(&mut wire, &hello("Ann"))
            .unwrap();

        assert_eq!(&wire[..2], &[0, 5]);
        assert_eq!(protocol.decode_frame(&wire[2..]).unwrap(), Chat::Hello(hello("Ann")));
    }

    #[test]
    fn test_framed_length_overflow() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut wire = Vec::new();
        let big = hello(&"x".repeat(300));

        let err = protocol
            .encode_framed::<u8, _, _>(&mut wire, &big)
            .unwrap_err();

        assert!(matches!(err, WireError::MessageLengthOverflow { max: 255, .. }));
        assert!(wire.is_empty());
    }

    #[test]
    fn test_decode_frame_rejects_trailing_bytes() {
        let protocol = ProtocolHandler::<Chat>::new();
        let mut body = Vec::new();
        protocol.encode_message(&mut body, &hello("a")).unwrap();
        body.push(0xFF);

        let err = protocol.decode_frame(&body).unwrap_err();
        assert!(matches!(err, WireError::TrailingBytes(1)));

        let mut recorder = Recorder::default();
        let err = protocol.process_frame(&body, &mut recorder).unwrap_err();
        assert!(matches!(err, WireError::TrailingBytes(1)));
    }

    #[test]
    fn test_protocol_codec_matches_message_encoding() {
        let message = Chat::Lobby(Lobby {
            users: vec!["Bob".into()],
        });
        let bytes = crate::to_bytes(&message).unwrap();

        assert_eq!(bytes[0], 1);
        assert_eq!(bytes.len(), message.encoded_size());
        assert_eq!(crate::from_bytes::<Chat>(&bytes).unwrap(), message);
    }
}
