//! Error types for structwire.

use thiserror::Error;

/// Main error type for all encode, decode and framing operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error reported by an underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream in the middle of a frame.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A read asked for more bytes than the buffer holds.
    #[error("Not enough bytes in buffer: requested {requested}, available {available}")]
    BufferUnderflow { requested: usize, available: usize },

    /// An encoded message does not fit in the chosen length field.
    #[error("Message length {length} exceeds length field maximum {max}")]
    MessageLengthOverflow { length: usize, max: u64 },

    /// A received frame announces a body larger than the configured limit.
    #[error("Frame length {length} exceeds maximum {max}")]
    FrameTooLarge { length: usize, max: usize },

    /// Sum type tag outside the declared alternatives.
    #[error("Invalid tag {index} for {type_name} (expected < {count})")]
    InvalidTag {
        type_name: &'static str,
        index: usize,
        count: usize,
    },

    /// Message type index outside the declared message set.
    #[error("Invalid message type {index} (protocol declares {count})")]
    InvalidMessageType { index: usize, count: usize },

    /// A magic number constant did not match the stream.
    #[error("Magic number mismatch: expected {expected}, found {found}")]
    MagicMismatch { expected: String, found: String },

    /// A varint carried more significant bits than a u64 holds.
    #[error("Varint value too large for u64")]
    VarIntOverflow,

    /// Input left over after a value that should have consumed it all.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    /// Bytes that do not form a valid value of the requested type.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error returned by a message handler.
    #[error("Handler error: {0}")]
    Handler(String),
}

/// Coarse classification of [`WireError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read or write exceeded available bytes, or a length limit was hit.
    Length,
    /// The transport failed.
    Io,
    /// Well-formed looking but semantically invalid input.
    Data,
    /// A user handler rejected a message.
    Handler,
}

impl WireError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WireError::Io(_) | WireError::ConnectionClosed => ErrorKind::Io,
            WireError::BufferUnderflow { .. }
            | WireError::MessageLengthOverflow { .. }
            | WireError::FrameTooLarge { .. } => ErrorKind::Length,
            WireError::InvalidTag { .. }
            | WireError::InvalidMessageType { .. }
            | WireError::MagicMismatch { .. }
            | WireError::VarIntOverflow
            | WireError::TrailingBytes(_)
            | WireError::InvalidData(_) => ErrorKind::Data,
            WireError::Handler(_) => ErrorKind::Handler,
        }
    }

    /// Check if this is a deserialization data error.
    #[inline]
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::Data
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let underflow = WireError::BufferUnderflow {
            requested: 4,
            available: 1,
        };
        assert_eq!(underflow.kind(), ErrorKind::Length);
        assert_eq!(WireError::VarIntOverflow.kind(), ErrorKind::Data);
        assert_eq!(WireError::ConnectionClosed.kind(), ErrorKind::Io);
        assert_eq!(WireError::Handler("nope".into()).kind(), ErrorKind::Handler);
        assert!(WireError::TrailingBytes(3).is_data_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: WireError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_display_messages() {
        let err = WireError::InvalidMessageType { index: 7, count: 2 };
        assert_eq!(err.to_string(), "Invalid message type 7 (protocol declares 2)");

        let err = WireError::MessageLengthOverflow {
            length: 300,
            max: 255,
        };
        assert!(err.to_string().contains("exceeds length field maximum"));
    }
}
