//! crates/session/src/snapshot_drain.rs
//!
//! Copies the RDB snapshot payload off the socket and onto disk, per
//! `spec.md` §4.2 step 5. Two wire shapes are possible depending on what
//! `REPLCONF CAPA EOF` negotiated:
//!
//! - On-disk transfer: `$<length>\r\n<length bytes of RDB>` with no
//!   trailing CRLF.
//! - Diskless transfer: `$EOF:<40 random bytes>\r\n` followed by RDB bytes
//!   of unknown length, terminated by that same 40-byte marker appearing
//!   as the last bytes of the stream. The marker itself is never part of
//!   the snapshot and must not reach disk — testable property 9 in
//!   `spec.md` §8.

use std::fs::File;
use std::io::{Read, Write};

use crate::error::{SessionError, SessionResult};
use crate::transport::ReadWrite;

/// Length of the diskless EOF delimiter, fixed by the Redis wire protocol.
const EOF_MARKER_LEN: usize = 40;
/// Read-side buffer size for on-disk transfers, matching the scale of the
/// teacher's own large-file copy buffers.
const COPY_BUFFER_SIZE: usize = 32 * 1024 * 1024;

/// The announced shape of the snapshot payload.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BulkHeader {
    /// A known-length payload follows, with no trailing terminator.
    Length(u64),
    /// An unknown-length payload follows, terminated by this 40-byte
    /// marker appearing as its last bytes.
    Eof([u8; EOF_MARKER_LEN]),
}

/// Reads the `$...\r\n` header line preceding the snapshot payload,
/// tolerating leading `\n` keepalive filler exactly as `spec.md` §4.1
/// requires.
pub(crate) fn read_bulk_header(stream: &mut dyn ReadWrite) -> SessionResult<BulkHeader> {
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte)?;
        if byte[0] != b'\n' {
            break;
        }
    }
    if byte[0] != b'$' {
        return Err(SessionError::protocol(format!(
            "expected snapshot bulk header, got byte {:#x}",
            byte[0]
        )));
    }

    let mut line = Vec::new();
    loop {
        stream.read_exact(&mut byte)?;
        if byte[0] == b'\r' {
            stream.read_exact(&mut byte)?;
            if byte[0] != b'\n' {
                return Err(SessionError::protocol("malformed snapshot bulk header"));
            }
            break;
        }
        line.push(byte[0]);
    }

    if let Some(marker_hex) = line.strip_prefix(b"EOF:") {
        if marker_hex.len() != EOF_MARKER_LEN {
            return Err(SessionError::protocol(format!(
                "diskless EOF marker has length {}, expected {EOF_MARKER_LEN}",
                marker_hex.len()
            )));
        }
        let mut marker = [0u8; EOF_MARKER_LEN];
        marker.copy_from_slice(marker_hex);
        return Ok(BulkHeader::Eof(marker));
    }

    let length: u64 = std::str::from_utf8(&line)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| SessionError::protocol("snapshot bulk header length is not an integer"))?;
    Ok(BulkHeader::Length(length))
}

/// Copies exactly `length` bytes from `stream` into `dest`.
///
/// # Errors
///
/// Returns [`SessionError::Truncated`] if the source closes the connection
/// before `length` bytes have been copied.
pub(crate) fn drain_known_length(stream: &mut dyn ReadWrite, dest: &mut File, length: u64) -> SessionResult<()> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE.min(length.max(1) as usize)];
    let mut remaining = length;
    while remaining > 0 {
        let want = buffer.len().min(remaining as usize);
        let read = stream.read(&mut buffer[..want])?;
        if read == 0 {
            return Err(SessionError::truncated(format!(
                "snapshot closed with {remaining} bytes still expected"
            )));
        }
        dest.write_all(&buffer[..read])?;
        remaining -= read as u64;
    }
    Ok(())
}

/// Copies RDB bytes from `stream` into `dest` until the trailing
/// `marker` bytes are seen, writing everything except the marker itself.
///
/// Implemented as a rolling window: bytes are only flushed to disk once
/// it's known they aren't the start of the marker, so the marker never
/// touches disk even when it straddles two read syscalls.
///
/// # Errors
///
/// Returns [`SessionError::Truncated`] if the source closes the connection
/// before the marker is seen.
pub(crate) fn drain_until_marker(
    stream: &mut dyn ReadWrite,
    dest: &mut File,
    marker: &[u8; EOF_MARKER_LEN],
) -> SessionResult<()> {
    let mut window = Vec::<u8>::with_capacity(EOF_MARKER_LEN * 2);
    let mut chunk = [0u8; 64 * 1024];

    loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Err(SessionError::truncated("diskless snapshot closed before EOF marker"));
        }
        window.extend_from_slice(&chunk[..read]);

        if window.len() > EOF_MARKER_LEN {
            let flushable = window.len() - EOF_MARKER_LEN;
            dest.write_all(&window[..flushable])?;
            window.drain(..flushable);
        }

        if window.len() == EOF_MARKER_LEN && window == marker {
            return Ok(());
        }
    }
}
