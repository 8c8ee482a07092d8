//! crates/session/src/session.rs
//!
//! Ties the handshake, capability negotiation, resync, and snapshot-drain
//! steps together into the single [`connect`] entry point, per `spec.md`
//! §4.2 end to end.
//!
//! `connect` runs steps 1-5 synchronously on the calling thread and returns
//! once the snapshot payload (if any) has been fully copied to disk. Before
//! returning it spawns the live-stream drain (T1/T3 in `spec.md` §5) on a
//! background thread, because the source starts writing live commands to
//! the same socket immediately after the snapshot payload ends — nothing
//! here waits for the snapshot decoder to catch up.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use spool::{CancelToken, SpoolWriter};

use crate::error::{SessionError, SessionResult};
use crate::handshake;
use crate::live::drain_live;
use crate::options::{Options, SourceAddress};
use crate::psync::{self, ResyncReply};
use crate::snapshot_drain::{self, BulkHeader};
use crate::stats::{SessionStats, SessionStatus};
use crate::transport::{self, ReadWrite};

/// What the handshake decided about the snapshot phase.
#[derive(Debug)]
pub enum SnapshotOutcome {
    /// A full snapshot was transferred and written to `snapshot_path`; the
    /// caller must decode it (e.g. with `rdb::decode_snapshot_file`) before
    /// the spool it's now being appended to can be parsed meaningfully.
    Full { snapshot_path: PathBuf },
    /// The source accepted a partial resync (`+CONTINUE`); no snapshot
    /// bytes were sent and the existing spool directory is still valid.
    Resumed,
}

/// A connected, handshaken replication session with its live-stream drain
/// already running in the background.
pub struct Session {
    /// Shared, lock-free progress counters for this session.
    pub stats: Arc<SessionStats>,
    /// Whether a snapshot needs decoding before the spool makes sense.
    pub snapshot: SnapshotOutcome,
    live_thread: JoinHandle<SessionResult<()>>,
}

impl Session {
    /// Blocks until the live-stream drain thread exits, which only happens
    /// on cancellation or a lost connection.
    ///
    /// # Errors
    ///
    /// Propagates whatever error terminated the live-stream drain.
    pub fn join_live(self) -> SessionResult<()> {
        self.live_thread
            .join()
            .unwrap_or_else(|_| Err(SessionError::protocol("live-stream thread panicked")))
    }
}

/// Runs the full handshake-through-snapshot-drain sequence described in
/// `spec.md` §4.2, then starts the live-stream drain in the background.
///
/// # Errors
///
/// Returns any [`SessionError`] raised by the handshake, capability
/// negotiation, resync request, or snapshot transfer. Every one of these
/// is fatal to the session — there is no partial-handshake resume.
pub fn connect(options: &Arc<Options>, cancel: &CancelToken) -> SessionResult<Session> {
    let stats = SessionStats::new();
    let mut stream = dial_and_handshake(options.address(), options, &stats)?;

    if options.prefer_replica() {
        stats.set_status(SessionStatus::Handshake);
        let info_text = handshake::info(&mut *stream, "replication")?;
        if let Some((host, port)) = handshake::best_replica(&info_text) {
            let replica_address = SourceAddress::new(host, port);
            if replica_address != *options.address() {
                stream = dial_and_handshake(&replica_address, options, &stats)?;
            }
        }
    }

    stats.set_status(SessionStatus::WaitBgsave);
    handshake::wait_for_bgsave(&mut *stream, cancel)?;

    stats.set_status(SessionStatus::ReceiveSnapshot);
    let snapshot = if handshake::supports_psync(&mut *stream)? {
        match psync::psync(&mut *stream, options.resume())? {
            ResyncReply::FullResync { offset, .. } => {
                stats.set_received_offset(offset);
                Some(receive_snapshot(&mut *stream, options)?)
            }
            ResyncReply::Continue { .. } => {
                // A partial resync carries no `FULLRESYNC <offset>` line of
                // its own — seed `received_offset` from the offset we asked
                // to resume from so the ack loop in `live.rs` doesn't
                // understate it by the whole resume baseline.
                if let Some(resume) = options.resume() {
                    stats.set_received_offset(resume.offset);
                }
                None
            }
        }
    } else {
        psync::sync(&mut *stream)?;
        stats.set_received_offset(0);
        Some(receive_snapshot(&mut *stream, options)?)
    };

    let snapshot_outcome = match &snapshot {
        Some(path) => SnapshotOutcome::Full {
            snapshot_path: path.clone(),
        },
        None => SnapshotOutcome::Resumed,
    };

    let spool_dir = options.spool_dir();
    let segment_max = options.segment_max_size();
    let mut spool_writer = SpoolWriter::open(&spool_dir, segment_max)?;
    if snapshot.is_some() {
        // A fresh full snapshot makes everything previously spooled stale.
        spool_writer.reinit()?;
        spool_writer = SpoolWriter::open(&spool_dir, segment_max)?;
    }

    let live_thread = {
        let stats = Arc::clone(&stats);
        let cancel = cancel.clone();
        thread::spawn(move || drain_live(&mut *stream, &mut spool_writer, &stats, &cancel))
    };

    Ok(Session {
        stats,
        snapshot: snapshot_outcome,
        live_thread,
    })
}

/// Dials `address` and runs the handshake and capability-negotiation steps
/// (steps 1-2 of `spec.md` §4.2), leaving the connection ready for the
/// bgsave wait.
fn dial_and_handshake(
    address: &SourceAddress,
    options: &Options,
    stats: &SessionStats,
) -> SessionResult<Box<dyn ReadWrite>> {
    stats.set_status(SessionStatus::Handshake);
    let mut stream = transport::connect(address, options.tls())?;

    handshake::ping(&mut *stream)?;
    if let Some(auth) = options.auth() {
        handshake::authenticate(&mut *stream, auth)?;
    }
    handshake::declare_listening_port(&mut *stream, options.listening_port())?;

    let diskless = if options.try_diskless() {
        handshake::declare_diskless_capability(&mut *stream)?
    } else {
        false
    };
    stats.set_diskless(diskless);

    Ok(stream)
}

/// Reads the snapshot bulk header and drains the payload to
/// `options.snapshot_path()`, returning that path.
fn receive_snapshot(stream: &mut dyn ReadWrite, options: &Options) -> SessionResult<PathBuf> {
    let path = options.snapshot_path();
    let mut file = std::fs::File::create(&path)?;
    match snapshot_drain::read_bulk_header(stream)? {
        BulkHeader::Length(length) => snapshot_drain::drain_known_length(stream, &mut file, length)?,
        BulkHeader::Eof(marker) => snapshot_drain::drain_until_marker(stream, &mut file, &marker)?,
    }
    file.sync_all()?;
    Ok(path)
}
