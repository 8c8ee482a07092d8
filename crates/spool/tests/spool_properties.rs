//! Segment-size, restart, and cross-rotation properties the writer and
//! reader must hold independently of the randomized append/read-identity
//! check in `proptest_append_read_identity.rs`.

use std::fs;
use std::io::Read as _;
use std::thread;
use std::time::Duration;

use spool::{CancelToken, SpoolReader, SpoolWriter};

fn segment_path(dir: &std::path::Path, index: u64) -> std::path::PathBuf {
    dir.join(format!("{index}.aof"))
}

#[test]
fn segment_size_invariant_holds_for_arbitrary_write_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let segment_max = 7u64;
    let mut writer = SpoolWriter::open(dir.path(), segment_max).unwrap();

    let total: u64 = 37;
    let mut written = 0u64;
    let mut chunk_len = 1usize;
    while written < total {
        let n = chunk_len.min((total - written) as usize);
        writer.write(&vec![b'x'; n]).unwrap();
        written += n as u64;
        chunk_len = (chunk_len % 5) + 1;
    }
    writer.close().unwrap();

    let mut sizes = Vec::new();
    let mut index = 0;
    loop {
        let path = segment_path(dir.path(), index);
        if !path.exists() {
            break;
        }
        sizes.push(fs::metadata(&path).unwrap().len());
        index += 1;
    }

    let (last, rest) = sizes.split_last().expect("at least one segment");
    assert!(rest.iter().all(|&s| s >= segment_max));
    assert!(*last < segment_max);
    assert_eq!(rest.iter().sum::<u64>() + last, total);
}

#[test]
fn restart_resumes_highest_segment_if_it_has_room_else_opens_next() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut writer = SpoolWriter::open(dir.path(), 10).unwrap();
        writer.write(b"12345").unwrap();
        writer.close().unwrap();
    }
    let writer = SpoolWriter::open(dir.path(), 10).unwrap();
    assert_eq!(writer.current_index(), 0, "segment with room is resumed");
    drop(writer);

    {
        // Top up segment 0 to exactly segment_max so it has no more room.
        let mut writer = SpoolWriter::open(dir.path(), 10).unwrap();
        writer.write(&vec![b'a'; 5]).unwrap();
        writer.close().unwrap();
    }
    assert_eq!(
        fs::metadata(segment_path(dir.path(), 0)).unwrap().len(),
        10
    );
    let writer = SpoolWriter::open(dir.path(), 10).unwrap();
    assert_eq!(writer.current_index(), 1, "full segment forces a new one");
}

#[test]
fn reader_follows_writer_across_many_rotations() {
    let dir = tempfile::tempdir().unwrap();
    let segment_max = 200u64;
    let total_bytes: usize = 1024 * 15;
    let chunk = vec![b'q'; 1024];

    let dir_clone = dir.path().to_path_buf();
    let writer_handle = thread::spawn(move || {
        let mut writer = SpoolWriter::open(&dir_clone, segment_max).unwrap();
        let mut sent = 0usize;
        while sent < total_bytes {
            writer.write(&chunk).unwrap();
            sent += chunk.len();
            thread::sleep(Duration::from_millis(1));
        }
        writer.close().unwrap();
        sent
    });

    let mut reader = SpoolReader::open(dir.path(), 0, CancelToken::new()).unwrap();
    let mut total_read = 0usize;
    let mut buf = [0u8; 15];
    while total_read < total_bytes {
        let n = reader.read(&mut buf).unwrap();
        total_read += n;
    }

    let sent = writer_handle.join().unwrap();
    assert_eq!(total_read, sent);
}
