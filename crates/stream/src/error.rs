//! crates/stream/src/error.rs
//!
//! Error types for the command-stream parser.

use thiserror::Error;

/// Result type for command-stream parsing.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur while parsing the live command stream out of the
/// spool.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The spool reader or the wire codec hit a protocol-level problem —
    /// fatal, unlike an ordinary EOF at the live-stream tail.
    #[error("command stream protocol error: {0}")]
    Protocol(
        #[from]
        #[source]
        wire::WireError,
    ),
    /// The reader was cancelled while blocked waiting on the spool.
    #[error("command stream reader cancelled")]
    Cancelled,
    /// The downstream sink's channel was dropped.
    #[error("command stream's downstream sink was dropped")]
    SinkClosed,
}
