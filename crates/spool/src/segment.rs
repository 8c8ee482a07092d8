//! crates/spool/src/segment.rs
//!
//! Segment filename conventions shared by the writer and reader: files are
//! named `<index>.aof` where `<index>` is a non-negative decimal integer,
//! sorted numerically (not lexicographically) by index.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SpoolResult;

/// Builds the path for segment `index` inside `dir`.
pub fn segment_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{index}.aof"))
}

/// Parses a segment filename (e.g. `"12.aof"`) into its index, or `None` if
/// the name doesn't match the `^[0-9]+\.aof$` pattern.
pub fn parse_segment_index(file_name: &str) -> Option<u64> {
    let digits = file_name.strip_suffix(".aof")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Scans `dir` for `<index>.aof` files and returns the highest index found,
/// or `None` if the directory contains no segments yet.
pub fn highest_index(dir: &Path) -> SpoolResult<Option<u64>> {
    let mut highest = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(index) = parse_segment_index(&name) {
            highest = Some(highest.map_or(index, |h: u64| h.max(index)));
        }
    }
    Ok(highest)
}

/// Scans `dir` for `<index>.aof` files and returns the lowest index found,
/// or `None` if the directory contains no segments yet.
///
/// Used on restart: a resumed reader starts at the oldest segment still on
/// disk rather than at `0`, since earlier segments may already have been
/// garbage-collected.
pub fn lowest_index(dir: &Path) -> SpoolResult<Option<u64>> {
    let mut lowest = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(index) = parse_segment_index(&name) {
            lowest = Some(lowest.map_or(index, |l: u64| l.min(index)));
        }
    }
    Ok(lowest)
}
