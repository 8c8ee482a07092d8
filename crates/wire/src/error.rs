use std::io;

use thiserror::Error;

/// Errors raised while decoding or encoding the length-prefixed array protocol.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended while a frame was only partially read.
    #[error("unexpected end of stream while reading a reply frame")]
    UnexpectedEof,
    /// A prefix byte, length, or terminator did not match the protocol grammar.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
}

/// Result type used throughout the wire codec.
pub type WireResult<T> = Result<T, WireError>;

impl WireError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
