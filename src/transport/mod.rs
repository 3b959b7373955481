//! Transport module - length-prefixed frames over tokio streams.
//!
//! The codecs are synchronous. These helpers do the awaiting: a frame is
//! read in full into memory, then decoded in one synchronous call. A task
//! cancelled while awaiting leaves no codec state behind, only a stream
//! positioned somewhere inside a frame.
//!
//! Works over anything implementing [`AsyncRead`] / [`AsyncWrite`]: TCP and
//! Unix sockets, pipes, or `tokio::io::duplex` in tests.
//!
//! # Example
//!
//! ```
//! use structwire::protocol::FrameConfig;
//! use structwire::transport::{recv_message, send_message};
//! use structwire::{Codec, Protocol, ProtocolHandler};
//!
//! #[derive(Codec, Debug, PartialEq)]
//! struct Tick(u64);
//!
//! #[derive(Protocol, Debug, PartialEq)]
//! enum Clock {
//!     Tick(Tick),
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let protocol = ProtocolHandler::<Clock>::new();
//! let (mut client, mut server) = tokio::io::duplex(1024);
//!
//! send_message::<u32, _, _, _>(&mut client, &protocol, &Tick(42)).await.unwrap();
//! drop(client);
//!
//! let config = FrameConfig::default();
//! let received = recv_message::<u32, _, _>(&mut server, &protocol, &config).await.unwrap();
//! assert_eq!(received, Some(Clock::Tick(Tick(42))));
//! assert_eq!(recv_message::<u32, _, _>(&mut server, &protocol, &config).await.unwrap(), None);
//! # });
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, WireError};
use crate::protocol::{
    decode_length, encode_length, Dispatch, FrameConfig, LengthField, Message, Protocol,
    ProtocolHandler,
};

/// Widest length field, `u64`.
const MAX_LENGTH_WIDTH: usize = 8;

/// Write `body` as one frame and flush.
pub async fn write_frame<L, W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    L: LengthField,
    W: AsyncWrite + Unpin,
{
    let mut prefix = Vec::with_capacity(L::WIDTH);
    encode_length::<L, _>(&mut prefix, body.len())?;

    writer.write_all(&prefix).await?;
    writer.write_all(body).await?;
    writer.flush().await?;

    tracing::trace!("Wrote frame: {} body bytes", body.len());
    Ok(())
}

/// Read one complete frame body.
///
/// Returns `Ok(None)` if the stream ends cleanly before a new frame starts.
///
/// # Errors
///
/// - [`WireError::ConnectionClosed`] if the stream ends inside a frame
/// - [`WireError::FrameTooLarge`] if the announced length exceeds
///   `config.max_frame_len`; the body is not read
pub async fn read_frame<L, R>(reader: &mut R, config: &FrameConfig) -> Result<Option<Bytes>>
where
    L: LengthField,
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; MAX_LENGTH_WIDTH];
    let prefix = &mut prefix[..L::WIDTH];

    let mut filled = 0;
    while filled < prefix.len() {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(WireError::ConnectionClosed);
        }
        filled += n;
    }

    let len = config.check_len(decode_length::<L, _>(&mut &prefix[..])?)?;

    // Grows as bytes arrive; the announced length is untrusted.
    let mut body = Vec::with_capacity(len.min(config.initial_capacity));
    let expected = u64::try_from(len).unwrap_or(u64::MAX);
    (&mut *reader).take(expected).read_to_end(&mut body).await?;
    if body.len() < len {
        tracing::debug!("Stream closed after {} of {} body bytes", body.len(), len);
        return Err(WireError::ConnectionClosed);
    }

    tracing::trace!("Read frame: {} body bytes", len);
    Ok(Some(Bytes::from(body)))
}

/// Encode `message` as one frame and write it.
pub async fn send_message<L, P, M, W>(
    writer: &mut W,
    protocol: &ProtocolHandler<P>,
    message: &M,
) -> Result<()>
where
    L: LengthField,
    P: Protocol,
    M: Message<P>,
    W: AsyncWrite + Unpin,
{
    let mut frame = BytesMut::with_capacity(L::WIDTH + protocol.message_size(message));
    protocol.encode_framed::<L, M, _>(&mut frame, message)?;

    writer.write_all(&frame).await?;
    writer.flush().await?;

    tracing::trace!("Sent message: {} bytes", frame.len());
    Ok(())
}

/// Read one frame and decode the message it carries.
///
/// Returns `Ok(None)` on a clean end of stream.
pub async fn recv_message<L, P, R>(
    reader: &mut R,
    protocol: &ProtocolHandler<P>,
    config: &FrameConfig,
) -> Result<Option<P>>
where
    L: LengthField,
    P: Protocol,
    R: AsyncRead + Unpin,
{
    match read_frame::<L, R>(reader, config).await? {
        Some(frame) => protocol.decode_frame(&frame).map(Some),
        None => Ok(None),
    }
}

/// Read one frame and dispatch its message to `handler`.
///
/// Returns `Ok(false)` on a clean end of stream, `Ok(true)` after a
/// message was handled.
pub async fn process_next<L, P, R, H>(
    reader: &mut R,
    protocol: &ProtocolHandler<P>,
    config: &FrameConfig,
    handler: &mut H,
) -> Result<bool>
where
    L: LengthField,
    P: Dispatch<H>,
    R: AsyncRead + Unpin,
{
    let Some(frame) = read_frame::<L, R>(reader, config).await? else {
        return Ok(false);
    };
    protocol.process_frame(&frame, handler)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Handler, HandlerResult};
    use crate::Codec;
    use tokio::io::duplex;

    #[derive(Codec, Debug, PartialEq)]
    struct Say(String);

    #[derive(Codec, Debug, PartialEq)]
    struct Count(u32);

    #[derive(crate::Protocol, Debug, PartialEq)]
    enum Talk {
        Say(Say),
        Count(Count),
    }

    #[derive(Default)]
    struct Log(Vec<String>);

    impl Handler<Say> for Log {
        fn handle(&mut self, message: Say) -> HandlerResult {
            self.0.push(message.0);
            Ok(())
        }
    }

    impl Handler<Count> for Log {
        fn handle(&mut self, message: Count) -> HandlerResult {
            self.0.push(message.0.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut a, mut b) = duplex(256);

        write_frame::<u16, _>(&mut a, b"abc").await.unwrap();
        write_frame::<u16, _>(&mut a, b"").await.unwrap();
        drop(a);

        let config = FrameConfig::default();
        let first = read_frame::<u16, _>(&mut b, &config).await.unwrap();
        assert_eq!(first.as_deref(), Some(&b"abc"[..]));

        let empty = read_frame::<u16, _>(&mut b, &config).await.unwrap();
        assert_eq!(empty.as_deref(), Some(&b""[..]));

        assert!(read_frame::<u16, _>(&mut b, &config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_inside_length_is_connection_closed() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&[0, 0]).await.unwrap();
        drop(a);

        let err = read_frame::<u32, _>(&mut b, &FrameConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_eof_inside_body_is_connection_closed() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&[0, 10, 1, 2, 3]).await.unwrap();
        drop(a);

        let err = read_frame::<u16, _>(&mut b, &FrameConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_large_announced_length_with_short_body() {
        let (mut a, mut b) = duplex(64);
        // Announces 64 MiB, delivers three bytes.
        a.write_all(&[0x04, 0x00, 0x00, 0x00, 7, 8, 9]).await.unwrap();
        drop(a);

        let config = FrameConfig::default()
            .with_max_frame_len(128 * 1024 * 1024)
            .with_initial_capacity(16);
        let err = read_frame::<u32, _>(&mut b, &config).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_body_larger_than_initial_capacity() {
        let (mut a, mut b) = duplex(16);
        let body: Vec<u8> = (0..200u8).collect();
        let config = FrameConfig::default().with_initial_capacity(8);

        let writer = tokio::spawn(async move {
            write_frame::<u16, _>(&mut a, &body).await.unwrap();
            body
        });
        let frame = read_frame::<u16, _>(&mut b, &config).await.unwrap().unwrap();
        let body = writer.await.unwrap();
        assert_eq!(&frame[..], &body[..]);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&[0, 0, 1, 0]).await.unwrap();

        let config = FrameConfig::default().with_max_frame_len(16);
        let err = read_frame::<u32, _>(&mut b, &config).await.unwrap_err();
        assert!(matches!(
            err,
            WireError::FrameTooLarge {
                length: 256,
                max: 16
            }
        ));
    }

    #[tokio::test]
    async fn test_write_frame_length_overflow() {
        let (mut a, _b) = duplex(1024);
        let body = vec![0u8; 300];

        let err = write_frame::<u8, _>(&mut a, &body).await.unwrap_err();
        assert!(matches!(err, WireError::MessageLengthOverflow { .. }));
    }

    #[tokio::test]
    async fn test_send_and_recv_messages() {
        let protocol = ProtocolHandler::<Talk>::new();
        let (mut a, mut b) = duplex(1024);

        send_message::<u32, _, _, _>(&mut a, &protocol, &Say("hi".into()))
            .await
            .unwrap();
        send_message::<u32, _, _, _>(&mut a, &protocol, &Count(3))
            .await
            .unwrap();
        drop(a);

        let config = FrameConfig::default();
        assert_eq!(
            recv_message::<u32, _, _>(&mut b, &protocol, &config)
                .await
                .unwrap(),
            Some(Talk::Say(Say("hi".into())))
        );
        assert_eq!(
            recv_message::<u32, _, _>(&mut b, &protocol, &config)
                .await
                .unwrap(),
            Some(Talk::Count(Count(3)))
        );
        assert_eq!(
            recv_message::<u32, _, _>(&mut b, &protocol, &config)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_process_next_until_eof() {
        let protocol = ProtocolHandler::<Talk>::new();
        let (mut a, mut b) = duplex(1024);

        send_message::<u16, _, _, _>(&mut a, &protocol, &Count(1))
            .await
            .unwrap();
        send_message::<u16, _, _, _>(&mut a, &protocol, &Say("two".into()))
            .await
            .unwrap();
        drop(a);

        let config = FrameConfig::default();
        let mut log = Log::default();
        while process_next::<u16, _, _, _>(&mut b, &protocol, &config, &mut log)
            .await
            .unwrap()
        {}

        assert_eq!(log.0, ["1", "two"]);
    }

    #[tokio::test]
    async fn test_recv_invalid_message_type() {
        let (mut a, mut b) = duplex(64);
        write_frame::<u16, _>(&mut a, &[9]).await.unwrap();

        let protocol = ProtocolHandler::<Talk>::new();
        let err = recv_message::<u16, _, _>(&mut b, &protocol, &FrameConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WireError::InvalidMessageType { index: 9, count: 2 }
        ));
    }
}
