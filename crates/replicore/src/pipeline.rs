//! crates/replicore/src/pipeline.rs
//!
//! Wires the five components together into the single [`run_session`]
//! entry point: `source socket → C2 → [snapshot file] → C3 → sink` and
//! `source socket → C2 → C4 (disk segments) → C5 → sink`, both
//! tributaries feeding one ordered sink.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use spool::{CancelToken, SpoolReader};
use wire::Entry;

use crate::error::{ReplicationError, ReplicationResult};

/// Bounded channel depth between each component's decode/parse thread and
/// the forwarding loop that hands entries to `sink` — large enough that a
/// momentarily slow downstream doesn't stall the decoder on every entry,
/// small enough that backpressure still reaches the decoder promptly.
const CHANNEL_DEPTH: usize = 4096;

/// Process-wide counter handing out the `session_id` each [`run_session`]
/// call tags its log lines with via [`logging::session_span`].
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs one replication session end to end against `options.address()`.
///
/// Connects and handshakes with the source (`session::connect`), drains
/// any full snapshot through the RDB decoder, then drains the live command
/// stream through the rotating spool and command-stream parser —
/// forwarding every resulting [`Entry`] to `sink` in order: every
/// snapshot-derived command before any live-stream command, with no
/// interleaving between the two tributaries.
///
/// `sink` is dropped (closing the channel for its consumer) when this
/// function returns, successfully or not.
///
/// # Errors
///
/// Returns whatever [`ReplicationError`] first terminates the session: a
/// failed handshake or resync, a snapshot decode failure, a spool I/O
/// error, a malformed command in the live stream, or the downstream sink
/// being dropped. Cancellation via `cancel` is treated as a clean shutdown
/// and returns `Ok(())`, not an error.
pub fn run_session(
    options: Arc<session::Options>,
    sink: Sender<Entry>,
    cancel: CancelToken,
) -> ReplicationResult<()> {
    let session_id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let span = logging::session_span(session_id);
    let _guard = span.enter();

    let session = session::connect(&options, &cancel)?;
    let stats = Arc::clone(&session.stats);

    let initial_db_id = match &session.snapshot {
        session::SnapshotOutcome::Full { snapshot_path } => {
            stats.set_status(session::SessionStatus::SyncSnapshot);
            drain_snapshot(snapshot_path, &sink, &cancel, &span)?.unwrap_or(0)
        }
        session::SnapshotOutcome::Resumed => 0,
    };

    if cancel.is_cancelled() {
        return Ok(());
    }

    let spool_dir = options.spool_dir();
    let start_index = spool::lowest_index(&spool_dir)?.unwrap_or(0);

    stats.set_status(session::SessionStatus::SyncLive);
    let stream_outcome = drain_live_stream(&spool_dir, start_index, initial_db_id, &sink, &stats, &cancel, &span);
    let live_outcome = session.join_live();

    if cancel.is_cancelled() {
        return Ok(());
    }
    stream_outcome?;
    live_outcome?;
    Ok(())
}

/// Decodes the snapshot file through `rdb` on its own thread (T2), and
/// forwards every resulting [`Entry`] to `sink` on the calling thread as it
/// arrives — this loop is what enforces the "snapshot before live" sink
/// ordering: ordering is enforced by sink consumer sequencing, not by
/// blocking the network reader.
///
/// Deletes the snapshot file once decoding finishes: exactly one snapshot
/// file exists per session, and it is removed once C3 is done with it.
///
/// Returns the `repl-stream-db` aux value the snapshot carried, if any.
fn drain_snapshot(
    snapshot_path: &Path,
    sink: &Sender<Entry>,
    cancel: &CancelToken,
    span: &tracing::Span,
) -> ReplicationResult<Option<u32>> {
    let (rdb_tx, rdb_rx) = crossbeam_channel::bounded::<Entry>(CHANNEL_DEPTH);
    let path = snapshot_path.to_path_buf();
    let decode_span = span.clone();
    let decode_handle = thread::Builder::new()
        .name("rdb-decode".to_owned())
        .spawn(move || {
            let _guard = decode_span.enter();
            rdb::decode_snapshot_file(&path, &rdb_tx, |bytes_read: u64| {
                tracing::info!(bytes_read, "snapshot decode progress");
            })
        })
        .map_err(|_| ReplicationError::TaskPanicked("rdb-decode spawn"))?;

    let mut forward_error = None;
    for entry in rdb_rx.iter() {
        if cancel.is_cancelled() {
            break;
        }
        if sink.send(entry).is_err() {
            forward_error = Some(ReplicationError::SinkClosed);
            break;
        }
    }
    // Dropping the receiver (implicit at end of the `for` loop's borrow,
    // made explicit here) is what unblocks a decode thread stuck mid-send
    // on a full channel after we stopped draining it.
    drop(rdb_rx);

    let decode_result = decode_handle
        .join()
        .map_err(|_| ReplicationError::TaskPanicked("rdb-decode"))?;

    if let Some(error) = forward_error {
        return Err(error);
    }
    if cancel.is_cancelled() {
        return Err(ReplicationError::Canceled);
    }

    std::fs::remove_file(snapshot_path)?;
    Ok(decode_result?)
}

/// Opens a following [`SpoolReader`] at `start_index` and drains it through
/// `stream::run` on its own thread (T4), forwarding survivors to `sink` on
/// the calling thread (T5's producer side) as they arrive.
///
/// `start_index` is the lowest segment index currently on disk — `0` for a
/// spool that was just reinitialized behind a fresh snapshot, or the
/// oldest surviving segment after a process restart.
fn drain_live_stream(
    spool_dir: &Path,
    start_index: u64,
    initial_db_id: u32,
    sink: &Sender<Entry>,
    stats: &session::SessionStats,
    cancel: &CancelToken,
    span: &tracing::Span,
) -> ReplicationResult<()> {
    let reader = SpoolReader::open(spool_dir, start_index, cancel.clone())?;
    let sent_offset = reader.total_bytes_read();
    let sent_offset_for_thread = Arc::clone(&sent_offset);

    let (live_tx, live_rx) = crossbeam_channel::bounded::<Entry>(CHANNEL_DEPTH);
    let parser_span = span.clone();
    let parser_handle = thread::Builder::new()
        .name("stream-parser".to_owned())
        .spawn(move || {
            let _guard = parser_span.enter();
            stream::run(reader, &live_tx, initial_db_id, &sent_offset_for_thread)
        })
        .map_err(|_| ReplicationError::TaskPanicked("stream-parser spawn"))?;

    let mut forward_error = None;
    for entry in live_rx.iter() {
        if cancel.is_cancelled() {
            break;
        }
        stats.set_now_db_id(entry.db_id);
        if sink.send(entry).is_err() {
            forward_error = Some(ReplicationError::SinkClosed);
            break;
        }
        stats.set_sent_offset(sent_offset.load(Ordering::SeqCst) as i64);
    }
    drop(live_rx);

    let parser_result = parser_handle
        .join()
        .map_err(|_| ReplicationError::TaskPanicked("stream-parser"))?;

    if let Some(error) = forward_error {
        return Err(error);
    }
    if cancel.is_cancelled() {
        return Ok(());
    }
    Ok(parser_result?)
}
