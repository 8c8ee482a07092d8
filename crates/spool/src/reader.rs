//! crates/spool/src/reader.rs
//!
//! The spool reader follows a writer across segment boundaries: when it
//! hits EOF on the current segment it cannot yet tell whether that's the
//! end of the stream so far or a rotation in progress, so it polls until
//! either the segment grows or the next segment appears.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{SpoolError, SpoolResult};
use crate::segment::segment_path;

/// How often the reader polls for segment growth or the next segment's
/// arrival while blocked at EOF.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of polling at EOF for either growth of the current segment or
/// the arrival of the next one.
enum PollOutcome {
    /// Current segment grew; caller should retry the read in place.
    Grew,
    /// Current segment didn't grow but the next segment now exists;
    /// caller should close this segment and move on.
    NextExists,
    /// Neither happened yet; caller should poll again.
    Unchanged,
    /// The reader was cancelled while waiting.
    Cancelled,
}

/// Reads a directory of rotating segment files as one continuous byte
/// stream, blocking across segment boundaries as the writer produces them.
pub struct SpoolReader {
    dir: PathBuf,
    cancel: CancelToken,
    file: File,
    index: u64,
    offset: u64,
    total_bytes_read: Arc<AtomicU64>,
}

impl SpoolReader {
    /// Waits (polling every [`POLL_INTERVAL`], cancellable) for
    /// `<start_index>.aof` to exist, then opens it positioned at byte 0.
    ///
    /// # Errors
    ///
    /// Returns [`SpoolError::Cancelled`] if `cancel` fires before the
    /// segment appears, or propagates an I/O failure opening it.
    pub fn open(dir: impl Into<PathBuf>, start_index: u64, cancel: CancelToken) -> SpoolResult<Self> {
        let dir = dir.into();
        let path = segment_path(&dir, start_index);
        loop {
            if path.exists() {
                break;
            }
            if cancel.is_cancelled() {
                return Err(SpoolError::Cancelled);
            }
            thread::sleep(POLL_INTERVAL);
        }
        let file = File::open(&path)?;
        Ok(Self {
            dir,
            cancel,
            file,
            index: start_index,
            offset: 0,
            total_bytes_read: Arc::new(AtomicU64::new(0)),
        })
    }

    /// A cross-task-visible counter of bytes this reader has delivered, for
    /// ack accounting by a task that doesn't otherwise see the read loop.
    #[must_use]
    pub fn total_bytes_read(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.total_bytes_read)
    }

    /// Reads up to `buf.len()` bytes, blocking across segment rotations.
    ///
    /// Returns `0` only when the reader has been cancelled while waiting
    /// at an EOF that hadn't yet resolved into growth or rotation — never
    /// as a signal of permanent end-of-stream, since the spool is logically
    /// unbounded while the writer is alive.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures reading or opening segment files, and
    /// returns [`SpoolError::Cancelled`] if cancellation fires while
    /// blocked at EOF.
    pub fn read_blocking(&mut self, buf: &mut [u8]) -> SpoolResult<usize> {
        loop {
            let n = self.file.read(buf)?;
            if n > 0 {
                self.offset += n as u64;
                self.total_bytes_read.fetch_add(n as u64, Ordering::SeqCst);
                return Ok(n);
            }

            match self.poll_at_eof()? {
                PollOutcome::Grew => continue,
                PollOutcome::NextExists => {
                    self.advance_to_next_segment()?;
                    continue;
                }
                PollOutcome::Unchanged => {
                    thread::sleep(POLL_INTERVAL);
                }
                PollOutcome::Cancelled => return Err(SpoolError::Cancelled),
            }
        }
    }

    fn poll_at_eof(&mut self) -> SpoolResult<PollOutcome> {
        if self.cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled);
        }

        let current_size = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(self.offset))?;
        let grew = current_size > self.offset;

        let next_exists = segment_path(&self.dir, self.index + 1).exists();

        Ok(match (grew, next_exists) {
            (true, _) => PollOutcome::Grew,
            (false, true) => PollOutcome::NextExists,
            (false, false) => PollOutcome::Unchanged,
        })
    }

    fn advance_to_next_segment(&mut self) -> SpoolResult<()> {
        // Drain whatever remains of the current segment past our offset
        // before moving on — a rotation observed mid-poll must not drop
        // bytes the writer committed to the segment we're leaving.
        let end = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(self.offset))?;
        if end > self.offset {
            return Ok(());
        }

        self.index += 1;
        let path = segment_path(&self.dir, self.index);
        self.file = File::open(&path)?;
        self.offset = 0;
        tracing::debug!(path = %path.display(), "spool reader crossed into next segment");
        Ok(())
    }
}

/// The [`std::io::ErrorKind`] a cancelled [`SpoolReader`] surfaces through
/// its [`Read`] impl, distinct from [`std::io::ErrorKind::Interrupted`] so
/// callers don't mistake cancellation for a retry signal.
pub const CANCELLED_IO_KIND: std::io::ErrorKind = std::io::ErrorKind::ConnectionAborted;

impl Read for SpoolReader {
    /// Delegates to [`SpoolReader::read_blocking`], translating
    /// [`SpoolError`] into an [`io::Error`] so the reader composes with any
    /// generic `Read` consumer, such as `wire::read_command`. Cancellation
    /// surfaces as [`CANCELLED_IO_KIND`], never as
    /// [`std::io::ErrorKind::Interrupted`] (which `read_exact` would retry
    /// forever against a cancellation that never clears).
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read_blocking(buf).map_err(|error| match error {
            SpoolError::Io(io_error) => io_error,
            SpoolError::Cancelled => std::io::Error::new(CANCELLED_IO_KIND, error.to_string()),
            other => std::io::Error::other(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SpoolWriter;
    use std::io::Write as _;
    use std::sync::mpsc;

    #[test]
    fn reads_bytes_written_before_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(segment_path(dir.path(), 0), b"hello").unwrap();

        let mut reader = SpoolReader::open(dir.path(), 0, CancelToken::new()).unwrap();
        let mut buf = [0u8; 5];
        let n = reader.read_blocking(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn follows_growth_of_current_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = segment_path(dir.path(), 0);
        std::fs::write(&path, b"first").unwrap();

        let mut reader = SpoolReader::open(dir.path(), 0, CancelToken::new()).unwrap();
        let mut buf = [0u8; 64];
        let n = reader.read_blocking(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"first");

        let (tx, rx) = mpsc::channel();
        let path_clone = path.clone();
        let writer_thread = thread::spawn(move || {
            rx.recv().unwrap();
            thread::sleep(Duration::from_millis(50));
            let mut f = std::fs::OpenOptions::new().append(true).open(path_clone).unwrap();
            f.write_all(b"second").unwrap();
        });
        tx.send(()).unwrap();

        let n = reader.read_blocking(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"second");
        writer_thread.join().unwrap();
    }

    #[test]
    fn crosses_into_next_segment_once_writer_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SpoolWriter::open(dir.path(), 4).unwrap();
        writer.write(b"abcd").unwrap();
        assert_eq!(writer.current_index(), 1);
        writer.write(b"ef").unwrap();
        writer.close().unwrap();

        let mut reader = SpoolReader::open(dir.path(), 0, CancelToken::new()).unwrap();
        let mut collected = Vec::new();
        let mut buf = [0u8; 3];

        loop {
            let n = reader.read_blocking(&mut buf).unwrap();
            collected.extend_from_slice(&buf[..n]);
            if collected.len() >= 6 {
                break;
            }
        }

        assert_eq!(collected, b"abcdef");
        assert_eq!(reader.total_bytes_read().load(Ordering::SeqCst), 6);
    }

    #[test]
    fn cancellation_during_eof_wait_returns_cancelled_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(segment_path(dir.path(), 0), b"only").unwrap();

        let cancel = CancelToken::new();
        let mut reader = SpoolReader::open(dir.path(), 0, cancel.clone()).unwrap();
        let mut buf = [0u8; 16];
        let n = reader.read_blocking(&mut buf).unwrap();
        assert_eq!(n, 4);

        let cancel_clone = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel_clone.cancel();
        });

        let err = reader.read_blocking(&mut buf).unwrap_err();
        assert!(matches!(err, SpoolError::Cancelled));
    }

    #[test]
    fn open_blocks_until_start_segment_exists_then_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        let cancel_clone = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel_clone.cancel();
        });

        let err = SpoolReader::open(dir.path(), 0, cancel).unwrap_err();
        assert!(matches!(err, SpoolError::Cancelled));
    }
}
