//! crates/spool/src/writer.rs
//!
//! The spool writer owns the current segment's file descriptor exclusively
//! and is the only task that ever creates or extends `<index>.aof` files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SpoolResult;
use crate::segment::{highest_index, segment_path};

/// Appends bytes to a directory of size-bounded, monotonically indexed
/// segment files.
///
/// On construction, resumes the highest-indexed segment already on disk if
/// it has room, rather than always starting a fresh segment — this lets a
/// restarted writer pick up a partially filled segment left by a previous
/// process instead of leaving a short segment behind forever.
pub struct SpoolWriter {
    dir: PathBuf,
    segment_max: u64,
    file: File,
    index: u64,
    size: u64,
}

impl SpoolWriter {
    /// Opens (or creates) the spool directory and positions the writer at
    /// the correct segment: the highest existing index if it still has
    /// room under `segment_max`, otherwise a fresh segment one past it, or
    /// `0.aof` if the directory is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the chosen
    /// segment file cannot be opened.
    pub fn open(dir: impl AsRef<Path>, segment_max: u64) -> SpoolResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let index = match highest_index(&dir)? {
            Some(existing) => {
                let size = fs::metadata(segment_path(&dir, existing))?.len();
                if size < segment_max {
                    existing
                } else {
                    existing + 1
                }
            }
            None => 0,
        };

        let path = segment_path(&dir, index);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        tracing::debug!(path = %path.display(), size, "spool writer resumed segment");

        Ok(Self {
            dir,
            segment_max,
            file,
            index,
            size,
        })
    }

    /// Appends `buf` to the current segment as a single write, rotating to
    /// a new segment afterward if the size threshold was crossed.
    ///
    /// A single call is never split across segment boundaries: the whole
    /// buffer lands in the segment that was current when the call started.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure writing to or rotating the segment file.
    pub fn write(&mut self, buf: &[u8]) -> SpoolResult<()> {
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        if self.size >= self.segment_max {
            self.rotate()?;
        }
        Ok(())
    }

    /// The index of the segment currently open for writing.
    #[must_use]
    pub fn current_index(&self) -> u64 {
        self.index
    }

    fn rotate(&mut self) -> SpoolResult<()> {
        self.file.sync_all()?;
        self.index += 1;
        let path = segment_path(&self.dir, self.index);
        self.file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.size = 0;
        tracing::debug!(path = %path.display(), "spool writer rotated segment");
        Ok(())
    }

    /// Flushes and fsyncs the current segment. Called on clean shutdown and
    /// on cancellation so no open descriptor survives the writer task.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure syncing the segment file.
    pub fn close(mut self) -> SpoolResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the current segment and removes every `*.aof` file in the
    /// spool directory. Used when a fresh full snapshot supersedes the live
    /// stream accumulated so far.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure syncing the current segment or removing
    /// files from the directory.
    pub fn reinit(mut self) -> SpoolResult<()> {
        self.file.sync_all()?;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if crate::segment::parse_segment_index(name).is_some() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}
