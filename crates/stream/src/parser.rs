//! crates/stream/src/parser.rs
//!
//! Drains the spool as a byte stream, decodes it through the wire codec
//! into command arrays, normalizes and DB-tags each one, and hands the
//! survivors to the downstream sink.

use std::io::BufReader;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;
use spool::SpoolReader;
use wire::Entry;

use crate::error::{StreamError, StreamResult};
use crate::normalize::{self, Decision};

/// How many bytes the buffered reader in front of the spool accumulates
/// before refilling; keeps `wire::read_command`'s many small reads from
/// each becoming a separate spool poll.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Runs the command-stream parser loop until the spool reader is
/// cancelled or a protocol error occurs.
///
/// `initial_db_id` seeds the logical current database — the
/// `repl-stream-db` value the snapshot decoder captured, or `0` if it
/// carried none. `sent_offset` is updated after every forwarded or
/// dropped command with the spool reader's cumulative byte position, for
/// a session-level caller to read without holding the parser loop's lock.
///
/// # Errors
///
/// Returns [`StreamError::Protocol`] on a malformed command array and
/// [`StreamError::Cancelled`] once the spool reader observes
/// cancellation. [`StreamError::SinkClosed`] if the downstream channel is
/// dropped mid-stream.
pub fn run(
    spool_reader: SpoolReader,
    sink: &Sender<Entry>,
    initial_db_id: u32,
    sent_offset: &AtomicU64,
) -> StreamResult<()> {
    let bytes_read = spool_reader.total_bytes_read();
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, spool_reader);
    let mut now_db_id = initial_db_id;

    loop {
        let argv = match wire::read_command(&mut reader) {
            Ok(argv) => argv,
            Err(wire::WireError::Io(io_error))
                if io_error.kind() == spool::CANCELLED_IO_KIND =>
            {
                return Err(StreamError::Cancelled);
            }
            Err(error) => return Err(StreamError::from(error)),
        };

        match normalize::classify(&argv) {
            Decision::SelectDb(db_id) => now_db_id = db_id,
            Decision::Drop => {}
            Decision::Forward => {
                sink.send(Entry {
                    db_id: now_db_id,
                    argv,
                })
                .map_err(|_| StreamError::SinkClosed)?;
            }
        }

        sent_offset.store(bytes_read.load(Ordering::SeqCst), Ordering::SeqCst);
    }
}
