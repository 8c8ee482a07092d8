//! crates/session/src/live.rs
//!
//! The live-stream phase: once the snapshot payload (if any) has drained,
//! the same socket carries an unbounded stream of RESP commands. This
//! module owns that socket for the rest of the session's life, interleaving
//! two jobs on one thread rather than splitting reader/writer across two:
//!
//! - copy incoming bytes straight into the spool (T1 in `spec.md` §5)
//! - send `REPLCONF ACK <offset>` on a fixed cadence (T3)
//!
//! A read timeout on the socket is what makes a single thread work here:
//! a timed-out read just means "nothing new arrived this tick, check
//! whether an ack is due and whether we've been cancelled."

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use spool::{CancelToken, SpoolWriter};

use crate::error::{SessionError, SessionResult};
use crate::handshake::call;
use crate::stats::{SessionStats, SessionStatus};
use crate::transport::ReadWrite;

/// How often `REPLCONF ACK` is sent while the live stream is flowing, per
/// `spec.md` §4.2 step 6.
const ACK_INTERVAL: Duration = Duration::from_millis(100);
/// Read chunk size for the live stream; no single command exceeds this in
/// practice, but reads need not align with command boundaries since the
/// spool is a raw byte log and `stream::run` reparses it independently.
const READ_CHUNK: usize = 64 * 1024;

/// Runs the live-stream drain loop until `cancel` fires or the source
/// closes the connection.
///
/// # Errors
///
/// Returns [`SessionError::Cancelled`] on cancellation, or
/// [`SessionError::Truncated`] if the source closes the connection.
pub(crate) fn drain_live(
    stream: &mut dyn ReadWrite,
    spool: &mut SpoolWriter,
    stats: &SessionStats,
    cancel: &CancelToken,
) -> SessionResult<()> {
    stream.set_read_timeout(Some(ACK_INTERVAL))?;
    stats.set_status(SessionStatus::SyncLive);

    let mut buffer = vec![0u8; READ_CHUNK];
    // Send the first ack immediately rather than waiting out a full
    // interval, so the source sees liveness right away.
    let mut last_ack = Instant::now() - ACK_INTERVAL;

    loop {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        match stream.read(&mut buffer) {
            Ok(0) => return Err(SessionError::truncated("live stream closed by source")),
            Ok(count) => {
                spool.write(&buffer[..count])?;
                stats.add_received(count as i64);
            }
            Err(error) if is_timeout(&error) => {}
            Err(error) => return Err(SessionError::from(error)),
        }

        if last_ack.elapsed() >= ACK_INTERVAL {
            send_ack(stream, stats.received_offset())?;
            last_ack = Instant::now();
        }
    }
}

fn send_ack(stream: &mut dyn ReadWrite, offset: i64) -> SessionResult<()> {
    call(stream, &[b"REPLCONF", b"ACK", offset.to_string().as_bytes()]).map(drop)
}

fn is_timeout(error: &std::io::Error) -> bool {
    matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::sync::mpsc;

    /// A stream that yields a fixed script of reads, raising `WouldBlock`
    /// between them to simulate the read-timeout tick, and records writes
    /// (the ack commands) onto a channel for inspection.
    struct ScriptedStream {
        chunks: Vec<Vec<u8>>,
        ticks_between: usize,
        ticks_since_last_chunk: usize,
        sent: mpsc::Sender<Vec<u8>>,
        exhausted_error: bool,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.ticks_since_last_chunk < self.ticks_between {
                self.ticks_since_last_chunk += 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.ticks_since_last_chunk = 0;
            if let Some(chunk) = self.chunks.pop() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            } else if self.exhausted_error {
                Err(std::io::Error::from(ErrorKind::WouldBlock))
            } else {
                Ok(0)
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let _ = self.sent.send(buf.to_vec());
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl ReadWrite for ScriptedStream {
        fn set_read_timeout(&self, _timeout: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copies_bytes_into_spool_and_advances_received_offset() {
        let (tx, _rx) = mpsc::channel();
        let mut stream = ScriptedStream {
            chunks: vec![b"RESP-bytes".to_vec()],
            ticks_between: 0,
            ticks_since_last_chunk: 0,
            sent: tx,
            exhausted_error: true,
        };
        let dir = tempfile::tempdir().unwrap();
        let mut spool_writer = SpoolWriter::open(dir.path(), 1024).unwrap();
        let stats = SessionStats::new();
        let cancel = CancelToken::new();

        let cancel_clone = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            cancel_clone.cancel();
        });

        let result = drain_live(&mut stream, &mut spool_writer, &stats, &cancel);
        handle.join().unwrap();

        assert!(matches!(result, Err(SessionError::Cancelled)));
        assert_eq!(stats.received_offset(), 10);
    }

    #[test]
    fn truncated_connection_is_reported() {
        let (tx, _rx) = mpsc::channel();
        let mut stream = ScriptedStream {
            chunks: Vec::new(),
            ticks_between: 0,
            ticks_since_last_chunk: 0,
            sent: tx,
            exhausted_error: false,
        };
        let dir = tempfile::tempdir().unwrap();
        let mut spool_writer = SpoolWriter::open(dir.path(), 1024).unwrap();
        let stats = SessionStats::new();
        let cancel = CancelToken::new();

        let result = drain_live(&mut stream, &mut spool_writer, &stats, &cancel);
        assert!(matches!(result, Err(SessionError::Truncated(_))));
    }
}
