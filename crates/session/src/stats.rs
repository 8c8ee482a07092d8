//! crates/session/src/stats.rs
//!
//! A lock-free snapshot of session progress, updated by T1 (network read)
//! and read by anything that wants a point-in-time view without touching
//! the read loop itself — the in-process equivalent of the Go original's
//! JSON-serializable `syncStandaloneReaderStat`, minus the HTTP endpoint
//! that polled it (out of scope per `spec.md` §1).

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// The session state machine's current phase.
///
/// Mirrors `spec.md` §3's session state enum exactly:
/// `Handshake → WaitBgsave → ReceiveSnapshot → SyncSnapshot → SyncLive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    /// Connecting, authenticating, and declaring capabilities.
    Handshake = 0,
    /// Polling `INFO persistence` for a bgsave/aof-rewrite already underway
    /// on the source.
    WaitBgsave = 1,
    /// Copying the RDB snapshot payload off the socket to a file.
    ReceiveSnapshot = 2,
    /// The snapshot decoder is walking the file the previous phase wrote.
    SyncSnapshot = 3,
    /// Live command stream is flowing; acks are being sent.
    SyncLive = 4,
}

impl SessionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Handshake,
            1 => Self::WaitBgsave,
            2 => Self::ReceiveSnapshot,
            3 => Self::SyncSnapshot,
            _ => Self::SyncLive,
        }
    }
}

/// Shared, atomically updated session progress counters.
///
/// Cloning an `Arc<SessionStats>` gives any task a read (or, for the
/// owning task, write) handle without a lock.
#[derive(Debug, Default)]
pub struct SessionStats {
    received_offset: AtomicI64,
    sent_offset: AtomicI64,
    status: AtomicU8,
    diskless: AtomicBool,
    now_db_id: AtomicU32,
}

impl SessionStats {
    /// Builds a fresh stats block in the `Handshake` state.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Cumulative live-stream bytes durably received from the source.
    #[must_use]
    pub fn received_offset(&self) -> i64 {
        self.received_offset.load(Ordering::SeqCst)
    }

    /// Sets the cumulative received offset to an absolute value — used once,
    /// right after `+FULLRESYNC`/`+CONTINUE` reports the source's starting
    /// point, after which [`Self::add_received`] advances it incrementally.
    pub fn set_received_offset(&self, value: i64) {
        self.received_offset.store(value, Ordering::SeqCst);
    }

    /// Advances the received offset by `delta` bytes (the exact count of
    /// live-stream bytes just written to the spool).
    pub fn add_received(&self, delta: i64) {
        self.received_offset.fetch_add(delta, Ordering::SeqCst);
    }

    /// Cumulative bytes the downstream parser has forwarded or dropped, as
    /// reported by the command-stream parser's own cumulative counter.
    #[must_use]
    pub fn sent_offset(&self) -> i64 {
        self.sent_offset.load(Ordering::SeqCst)
    }

    /// Updates the sent offset, called by the command-stream parser.
    pub fn set_sent_offset(&self, value: i64) {
        self.sent_offset.store(value, Ordering::SeqCst);
    }

    /// The current session phase.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Transitions to a new phase.
    pub fn set_status(&self, status: SessionStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    /// Whether this session negotiated diskless (`CAPA EOF`) snapshot
    /// transfer.
    #[must_use]
    pub fn diskless(&self) -> bool {
        self.diskless.load(Ordering::SeqCst)
    }

    /// Records whether diskless transfer was negotiated.
    pub fn set_diskless(&self, diskless: bool) {
        self.diskless.store(diskless, Ordering::SeqCst);
    }

    /// The logical database the live command stream is currently tagging
    /// entries with.
    #[must_use]
    pub fn now_db_id(&self) -> u32 {
        self.now_db_id.load(Ordering::SeqCst)
    }

    /// Updates the logical current database.
    pub fn set_now_db_id(&self, db_id: u32) {
        self.now_db_id.store(db_id, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_handshake_phase() {
        let stats = SessionStats::new();
        assert_eq!(stats.status(), SessionStatus::Handshake);
        assert_eq!(stats.received_offset(), 0);
    }

    #[test]
    fn received_offset_advances_incrementally() {
        let stats = SessionStats::new();
        stats.set_received_offset(1000);
        stats.add_received(250);
        assert_eq!(stats.received_offset(), 1250);
    }

    #[test]
    fn status_round_trips_every_phase() {
        let stats = SessionStats::new();
        for phase in [
            SessionStatus::Handshake,
            SessionStatus::WaitBgsave,
            SessionStatus::ReceiveSnapshot,
            SessionStatus::SyncSnapshot,
            SessionStatus::SyncLive,
        ] {
            stats.set_status(phase);
            assert_eq!(stats.status(), phase);
        }
    }
}
