//! crates/session/src/error.rs
//!
//! Error types for the replication session state machine.

use std::io;

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can terminate a replication session.
///
/// Per `spec.md` §7, every failure in the handshake-through-snapshot-drain
/// phases (§4.2 steps 1-5) is fatal to the session — a snapshot transfer
/// cannot be resumed mid-flight. A failure in the live-drain phase (step 6)
/// is also fatal to the session but leaves the spool on disk intact so a
/// fresh session can resume from it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The TCP connection could not be established or was lost.
    #[error("network error: {0}")]
    Network(String),
    /// TLS handshake or I/O failed.
    #[error("TLS error: {0}")]
    Tls(String),
    /// The source replied with something other than what the handshake step
    /// expected (e.g. `-ERR` to `AUTH`, a non-`PONG` reply to `PING`).
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The wire codec rejected a reply frame.
    #[error(transparent)]
    Wire(#[from] wire::WireError),
    /// The rotating spool rejected a write or read.
    #[error(transparent)]
    Spool(#[from] spool::SpoolError),
    /// A snapshot transfer truncated before its announced length, or the
    /// diskless EOF marker never arrived before the socket closed.
    #[error("snapshot transfer truncated: {0}")]
    Truncated(String),
    /// An I/O failure against the snapshot file or another local resource.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The session was cancelled.
    #[error("session cancelled")]
    Cancelled,
    /// The source does not support a capability this session requires
    /// (e.g. a pre-2.8 source with no `PSYNC` support and `SYNC` disabled).
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl SessionError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub(crate) fn truncated(message: impl Into<String>) -> Self {
        Self::Truncated(message.into())
    }
}
