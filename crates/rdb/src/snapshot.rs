use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crossbeam_channel::Sender;
use wire::Entry;

use crate::decoder::{self, ProgressHook};
use crate::error::{RdbError, RdbResult};

/// Minimum RDB snapshot buffer: 9-byte header, smallest meaningful read.
const HEADER_LEN: usize = 9;

/// Opens `path`, verifies its 9-byte `REDIS<version>` header, and decodes
/// the body, emitting one [`Entry`] per reconstruction command into `sink`.
///
/// Returns the `repl-stream-db` aux value the snapshot carried, if any.
///
/// # Errors
///
/// Returns [`RdbError::BadMagic`] if the header doesn't start with `REDIS`
/// or its version digits aren't ASCII decimal, and propagates any decode
/// error from the body.
pub fn decode_snapshot_file(
    path: &Path,
    sink: &Sender<Entry>,
    progress: impl ProgressHook,
) -> RdbResult<Option<u32>> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(1 << 20, file);
    let version = read_header(&mut reader)?;
    tracing::debug!(path = %path.display(), version, "decoding RDB snapshot");
    decoder::decode_body(reader, sink, progress)
}

fn read_header<R: Read>(reader: &mut R) -> RdbResult<u32> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    if &header[0..5] != b"REDIS" {
        return Err(RdbError::BadMagic(format!(
            "expected REDIS magic, found {:?}",
            &header[0..5]
        )));
    }
    let digits = std::str::from_utf8(&header[5..9])
        .map_err(|_| RdbError::BadMagic("version field was not ASCII".to_owned()))?;
    digits
        .parse::<u32>()
        .map_err(|_| RdbError::BadMagic(format!("version field {digits:?} is not numeric")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_valid_header() {
        let mut cursor = Cursor::new(b"REDIS0011".to_vec());
        assert_eq!(read_header(&mut cursor).unwrap(), 11);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut cursor = Cursor::new(b"GARBAGE11".to_vec());
        assert!(matches!(
            read_header(&mut cursor).unwrap_err(),
            RdbError::BadMagic(_)
        ));
    }

    #[test]
    fn rejects_non_numeric_version() {
        let mut cursor = Cursor::new(b"REDISabcd".to_vec());
        assert!(matches!(
            read_header(&mut cursor).unwrap_err(),
            RdbError::BadMagic(_)
        ));
    }
}
