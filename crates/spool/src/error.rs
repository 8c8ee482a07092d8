//! crates/spool/src/error.rs
//!
//! Error types for the rotating command spool.

use std::io;

use thiserror::Error;

/// Result type for spool operations.
pub type SpoolResult<T> = Result<T, SpoolError>;

/// Errors that can occur while writing or reading the spool.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// I/O error occurred against a segment file.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// A segment filename did not match the `<decimal>.aof` pattern.
    #[error("malformed segment filename: {0}")]
    MalformedSegmentName(String),
    /// The reader was cancelled while waiting for a segment to exist or grow.
    #[error("spool reader cancelled")]
    Cancelled,
}
