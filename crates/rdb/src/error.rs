use std::io;

use thiserror::Error;

/// Result type used throughout the snapshot decoder.
pub type RdbResult<T> = Result<T, RdbError>;

/// Errors that can occur while decoding a binary RDB snapshot.
///
/// A decode failure always aborts the whole session: a half-imported
/// snapshot cannot be safely resumed or repaired in place.
#[derive(Debug, Error)]
pub enum RdbError {
    /// The file header was not `REDIS` followed by four ASCII digits.
    #[error("invalid snapshot header: {0}")]
    BadMagic(String),
    /// A type byte, opcode, or structural field had no valid interpretation.
    #[error("malformed snapshot: {0}")]
    Malformed(String),
    /// The value or module type is recognized but this decoder does not
    /// support reconstructing it (e.g. legacy function library data).
    #[error("unsupported snapshot feature: {0}")]
    Unsupported(String),
    /// The file ended before a value or the EOF opcode was read.
    #[error("snapshot truncated: {0}")]
    Truncated(String),
    /// The underlying file read failed.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
}

impl RdbError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub(crate) fn truncated(message: impl Into<String>) -> Self {
        Self::Truncated(message.into())
    }
}
