//! Replica-impersonating replication session.
//!
//! This crate drives one connection to a Redis-compatible source exactly
//! the way a real replica would: handshake, capability negotiation, resync
//! request, snapshot transfer, and the live command stream's ack loop. It
//! produces only bytes — durably spooled via [`spool::SpoolWriter`] and, for
//! the snapshot, a plain RDB file on disk — and leaves decoding those bytes
//! into normalized entries to the `rdb` and `stream` crates.
//!
//! The state machine is the one named in `spec.md` §3:
//! `Handshake → WaitBgsave → ReceiveSnapshot → SyncSnapshot → SyncLive`,
//! observable at any point through [`stats::SessionStats`].

mod error;
mod handshake;
mod live;
mod options;
mod psync;
mod session;
mod snapshot_drain;
mod stats;
mod transport;

pub use error::{SessionError, SessionResult};
pub use options::{AuthCredentials, Options, OptionsBuilder, OptionsError, ResumeOffset, SourceAddress, TlsOptions};
pub use session::{connect, Session, SnapshotOutcome};
pub use stats::{SessionStats, SessionStatus};
