//! A writer fed arbitrary chunking of a byte sequence under a small
//! `segment_max`, read back by a reader started at segment 0, must
//! reproduce the original sequence exactly regardless of how it was
//! chunked on write.

use std::io::Read as _;
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use spool::{CancelToken, SpoolReader, SpoolWriter};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn append_read_identity(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..200),
        0..40,
    )) {
        let dir = tempfile::tempdir().unwrap();
        let expected: Vec<u8> = chunks.iter().flatten().copied().collect();

        let mut writer = SpoolWriter::open(dir.path(), 1024).unwrap();
        for chunk in &chunks {
            writer.write(chunk).unwrap();
        }
        writer.close().unwrap();

        let mut reader = SpoolReader::open(dir.path(), 0, CancelToken::new()).unwrap();
        let mut collected = Vec::new();
        let mut buf = [0u8; 64];
        while collected.len() < expected.len() {
            match reader.read(&mut buf) {
                Ok(n) if n > 0 => collected.extend_from_slice(&buf[..n]),
                Ok(_) => thread::sleep(Duration::from_millis(5)),
                Err(_) => break,
            }
        }

        prop_assert_eq!(collected, expected);
    }
}
