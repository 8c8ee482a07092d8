//! crates/replicore/src/error.rs
//!
//! The top-level error surface `run_session` returns, wrapping each
//! component's own error via `#[from]` (`Network`, `Protocol`,
//! `Snapshot`, `Io`, `Canceled`, `Unsupported`) at the point where they
//! cross a component boundary.

use thiserror::Error;

/// Result type returned by [`crate::run_session`].
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that can terminate a replication session, aggregated from every
/// component this crate wires together.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The handshake, resync, or snapshot-drain phase failed — every one
    /// of these is fatal to the session.
    #[error(transparent)]
    Session(#[from] session::SessionError),
    /// The snapshot decoder aborted partway through the RDB file. A
    /// half-imported snapshot is never handed downstream.
    #[error(transparent)]
    Snapshot(#[from] rdb::RdbError),
    /// The command-stream parser hit a malformed command array in the
    /// spool.
    #[error(transparent)]
    Stream(#[from] stream::StreamError),
    /// The rotating spool rejected a read or write.
    #[error(transparent)]
    Spool(#[from] spool::SpoolError),
    /// The downstream sink's channel was dropped before the session ended.
    #[error("downstream sink was dropped before the session ended")]
    SinkClosed,
    /// A background task panicked instead of returning an error.
    #[error("{0} task panicked")]
    TaskPanicked(&'static str),
    /// The session was cancelled; a clean shutdown, not a failure, but
    /// still representable for callers that distinguish the two.
    #[error("session cancelled")]
    Canceled,
    /// A local filesystem operation failed (e.g. removing the drained
    /// snapshot file) outside any single component's own error type.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
