use std::io::Read;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use wire::Entry;

use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::opcode;
use crate::value;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Reports decode progress. Called at most once per [`PROGRESS_INTERVAL`]
/// with the number of snapshot bytes consumed so far.
pub trait ProgressHook {
    /// Invoked with the cumulative byte offset into the snapshot file.
    fn on_progress(&mut self, bytes_read: u64);
}

impl<F: FnMut(u64)> ProgressHook for F {
    fn on_progress(&mut self, bytes_read: u64) {
        self(bytes_read);
    }
}

/// A no-op progress hook for callers that don't need reporting.
pub struct NoProgress;

impl ProgressHook for NoProgress {
    fn on_progress(&mut self, _bytes_read: u64) {}
}

/// Counts bytes read through an inner reader without buffering them.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Walks a snapshot body strictly sequentially, emitting one [`Entry`] per
/// reconstruction command into `sink`.
///
/// Returns the `repl-stream-db` aux value, if the snapshot carried one —
/// the DB the live command stream should start in once this snapshot has
/// been fully applied.
///
/// # Errors
///
/// Any decode failure aborts the walk immediately: a half-imported
/// snapshot is unsafe to resume or repair in place.
pub fn decode_body<R: Read>(
    reader: R,
    sink: &Sender<Entry>,
    mut progress: impl ProgressHook,
) -> RdbResult<Option<u32>> {
    let mut reader = CountingReader { inner: reader, count: 0 };
    let mut now_db_id: u32 = 0;
    let mut pending_expire_ms: i64 = 0;
    let mut repl_stream_db_id: Option<u32> = None;
    let mut last_report = Instant::now();

    loop {
        let type_byte = length::read_byte(&mut reader)?;
        match type_byte {
            opcode::SLOT_INFO => {
                let _slot_id = length::read_length(&mut reader)?;
                let _slot_size = length::read_length(&mut reader)?;
                let _expires_slot_size = length::read_length(&mut reader)?;
            }
            opcode::FUNCTION2 => {
                let blob = length::read_string(&mut reader)?;
                emit(sink, now_db_id, &[b"FUNCTION", b"LOAD", &blob])?;
            }
            opcode::FUNCTION_PRE_GA => {
                return Err(RdbError::unsupported(
                    "legacy (pre-GA) function library data is not supported",
                ));
            }
            opcode::MODULE_AUX => {
                skip_module_aux(&mut reader)?;
            }
            opcode::IDLE => {
                let _idle = length::read_length(&mut reader)?;
            }
            opcode::FREQ => {
                let _freq = length::read_byte(&mut reader)?;
            }
            opcode::AUX => {
                let key = length::read_string(&mut reader)?;
                let aux_value = length::read_string(&mut reader)?;
                if key == b"repl-stream-db" {
                    let text = String::from_utf8(aux_value.clone())
                        .map_err(|_| RdbError::malformed("repl-stream-db aux value not UTF-8"))?;
                    let db_id: u32 = text
                        .parse()
                        .map_err(|_| RdbError::malformed("repl-stream-db aux value not an integer"))?;
                    repl_stream_db_id = Some(db_id);
                } else if key == b"lua" {
                    emit(sink, now_db_id, &[b"SCRIPT", b"LOAD", &aux_value])?;
                } else {
                    tracing::debug!(
                        key = %String::from_utf8_lossy(&key),
                        "unrecognized RDB aux field"
                    );
                }
            }
            opcode::RESIZE_DB => {
                let _db_size = length::read_length(&mut reader)?;
                let _expire_size = length::read_length(&mut reader)?;
            }
            opcode::EXPIRE_MS => {
                let absolute_ms = length::read_u64_le(&mut reader)?;
                pending_expire_ms = signed_remaining_ms(absolute_ms as i64);
            }
            opcode::EXPIRE_SECONDS => {
                let absolute_s = length::read_u32_le(&mut reader)?;
                pending_expire_ms = signed_remaining_ms(i64::from(absolute_s) * 1000);
            }
            opcode::SELECT_DB => {
                now_db_id = length::read_length(&mut reader)? as u32;
            }
            opcode::EOF => {
                return Ok(repl_stream_db_id);
            }
            value_type => {
                let key = length::read_string(&mut reader)?;
                emit(sink, now_db_id, &[b"DEL", &key])?;
                for command in value::decode(&mut reader, &key, value_type)? {
                    emit_owned(sink, now_db_id, command)?;
                }
                if pending_expire_ms != 0 {
                    emit(
                        sink,
                        now_db_id,
                        &[b"PEXPIRE", &key, pending_expire_ms.to_string().as_bytes()],
                    )?;
                }
                pending_expire_ms = 0;
            }
        }

        if last_report.elapsed() >= PROGRESS_INTERVAL {
            progress.on_progress(reader.count);
            last_report = Instant::now();
        }
    }
}

fn signed_remaining_ms(absolute_ms: i64) -> i64 {
    let now_ms = current_unix_millis();
    (absolute_ms - now_ms).max(1)
}

fn current_unix_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn skip_module_aux<R: Read>(reader: &mut R) -> RdbResult<()> {
    let _module_id = length::read_length(reader)?;
    let _when_opcode = length::read_length(reader)?;
    let _when = length::read_length(reader)?;
    loop {
        let inner_opcode = length::read_length(reader)?;
        match inner_opcode {
            opcode::MODULE_OPCODE_EOF => return Ok(()),
            opcode::MODULE_OPCODE_SINT | opcode::MODULE_OPCODE_UINT => {
                let _ = length::read_length(reader)?;
            }
            opcode::MODULE_OPCODE_FLOAT => {
                let _ = length::read_float(reader)?;
            }
            opcode::MODULE_OPCODE_DOUBLE => {
                let _ = length::read_double(reader)?;
            }
            opcode::MODULE_OPCODE_STRING => {
                let _ = length::read_string(reader)?;
            }
            other => {
                return Err(RdbError::malformed(format!(
                    "unknown module aux opcode {other}"
                )))
            }
        }
    }
}

fn emit(sink: &Sender<Entry>, db_id: u32, argv: &[&[u8]]) -> RdbResult<()> {
    emit_owned(sink, db_id, argv.iter().map(|arg| arg.to_vec()).collect())
}

fn emit_owned(sink: &Sender<Entry>, db_id: u32, argv: Vec<Vec<u8>>) -> RdbResult<()> {
    sink.send(Entry { db_id, argv })
        .map_err(|_| RdbError::malformed("snapshot decoder's downstream sink was dropped"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn signed_remaining_ms_reflects_future_absolute_time() {
        let now = current_unix_millis();
        assert_eq!(signed_remaining_ms(now + 5_000), 5_000);
    }

    #[test]
    fn signed_remaining_ms_floors_past_absolute_time_at_one() {
        let now = current_unix_millis();
        // An expire time already in the past must still carry a positive
        // ms value forward — `spec.md` §7/§8 item 7 require `max(1, ...)`,
        // never zero or negative, so a replayed PEXPIRE still expires the
        // key rather than being rejected or meaning "no expire".
        assert_eq!(signed_remaining_ms(now - 10_000), 1);
        assert_eq!(signed_remaining_ms(0), 1);
    }

    /// Builds a minimal snapshot body: `SELECT 0`, an `EXPIRE_MS`/
    /// `EXPIRE_SECONDS` opcode holding an absolute time, then a one-byte
    /// string key/value, then `EOF`.
    fn body_with_expire(expire_opcode: u8, expire_bytes: &[u8]) -> Vec<u8> {
        let mut body = vec![opcode::SELECT_DB, 0x00];
        body.push(expire_opcode);
        body.extend_from_slice(expire_bytes);
        body.push(0x00); // STRING value type
        body.push(0x01);
        body.push(b'k');
        body.push(0x01);
        body.push(b'v');
        body.push(opcode::EOF);
        body
    }

    #[test]
    fn expire_ms_opcode_emits_pexpire_with_remaining_ms() {
        let now = current_unix_millis();
        let absolute_ms = (now + 60_000) as u64;
        let body = body_with_expire(opcode::EXPIRE_MS, &absolute_ms.to_le_bytes());

        let (tx, rx) = crossbeam_channel::unbounded();
        decode_body(Cursor::new(body), &tx, NoProgress).unwrap();
        drop(tx);
        let entries: Vec<_> = rx.iter().collect();

        assert_eq!(entries[0].argv, vec![b"DEL".to_vec(), b"k".to_vec()]);
        assert_eq!(entries[1].argv, vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
        let pexpire = &entries[2].argv;
        assert_eq!(pexpire[0], b"PEXPIRE");
        assert_eq!(pexpire[1], b"k");
        let ms: i64 = std::str::from_utf8(&pexpire[2]).unwrap().parse().unwrap();
        assert!((1..=60_000).contains(&ms), "expected remaining ms close to 60000, got {ms}");
    }

    #[test]
    fn expire_ms_opcode_in_the_past_floors_at_one_ms() {
        let body = body_with_expire(opcode::EXPIRE_MS, &1u64.to_le_bytes());

        let (tx, rx) = crossbeam_channel::unbounded();
        decode_body(Cursor::new(body), &tx, NoProgress).unwrap();
        drop(tx);
        let entries: Vec<_> = rx.iter().collect();

        assert_eq!(entries[2].argv, vec![b"PEXPIRE".to_vec(), b"k".to_vec(), b"1".to_vec()]);
    }

    #[test]
    fn expire_seconds_opcode_converts_to_remaining_ms() {
        let now = current_unix_millis();
        let absolute_s = ((now / 1000) + 60) as u32;
        let body = body_with_expire(opcode::EXPIRE_SECONDS, &absolute_s.to_le_bytes());

        let (tx, rx) = crossbeam_channel::unbounded();
        decode_body(Cursor::new(body), &tx, NoProgress).unwrap();
        drop(tx);
        let entries: Vec<_> = rx.iter().collect();

        let pexpire = &entries[2].argv;
        assert_eq!(pexpire[0], b"PEXPIRE");
        let ms: i64 = std::str::from_utf8(&pexpire[2]).unwrap().parse().unwrap();
        assert!((1..=60_000).contains(&ms), "expected remaining ms close to 60000, got {ms}");
    }
}
