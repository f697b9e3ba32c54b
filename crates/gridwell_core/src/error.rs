//! Error types for gridwell_core

use std::io;

use thiserror::Error;

use crate::value::ArgType;

/// A value did not have the shape the caller asked for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Tag disagrees with the declared type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ArgType, actual: ArgType },

    /// Bytes were expected to be text.
    #[error("invalid UTF-8 in text argument")]
    InvalidUtf8,
}

/// Failure while reading or writing the binary wire format.
#[derive(Error, Debug)]
pub enum WireError {
    /// Underlying stream failed or closed early.
    #[error("wire I/O failed: {0}")]
    Io(#[from] io::Error),

    /// An argument carried a type tag outside the table.
    #[error("unknown argument tag {0}")]
    UnknownTag(u8),

    /// A length prefix exceeded the configured ceiling.
    #[error("length {len} exceeds limit of {limit} bytes")]
    TooLarge { len: u64, limit: u64 },

    /// A complete message was followed by unread bytes.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// Text field was not UTF-8.
    #[error("invalid UTF-8 in text field")]
    InvalidUtf8,
}

impl WireError {
    /// True when the peer closed the stream (clean disconnect rather than corruption).
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            WireError::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}

/// Result type for wire operations.
pub type WireResult<T> = std::result::Result<T, WireError>;
