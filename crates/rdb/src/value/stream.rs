use std::io::Read;

use crate::command::{command, Command};
use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::listpack;
use crate::opcode;

const FLAG_DELETED: i64 = 1 << 0;
const FLAG_SAMEFIELDS: i64 = 1 << 1;

/// Decodes any of the stream-shaped value types: a radix-tree of
/// listpack-packed entries, stream-level metadata, and consumer groups.
///
/// Emits one `XADD` per live (non-deleted) entry, then one `XSETID` fixing
/// the stream's last-delivered ID, then one `XGROUP CREATE ... MKSTREAM`
/// per consumer group at its last-delivered ID. Per-consumer PEL state is
/// walked (to keep the reader positioned correctly) but not replayed —
/// this decoder's output contract is the `XADD`/`XGROUP CREATE`/`XSETID`
/// triad named for this value kind.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    let has_extended_ids = type_byte != opcode::STREAM_LISTPACKS;
    let has_consumer_active_time = type_byte == opcode::STREAM_LISTPACKS_3;

    let mut out = Vec::new();
    let node_count = length::read_length(reader)?;
    for _ in 0..node_count {
        let node_key = length::read_string(reader)?;
        if node_key.len() != 16 {
            return Err(RdbError::malformed("stream rax node key is not 16 bytes"));
        }
        let master_ms = i64::from_be_bytes(node_key[0..8].try_into().unwrap());
        let master_seq = i64::from_be_bytes(node_key[8..16].try_into().unwrap());
        let listpack_blob = length::read_string(reader)?;
        out.extend(decode_node(&listpack_blob, key, master_ms, master_seq)?);
    }

    let _length = length::read_length(reader)?;
    let last_ms = length::read_length(reader)? as i64;
    let last_seq = length::read_length(reader)? as i64;

    if has_extended_ids {
        let _first_ms = length::read_length(reader)?;
        let _first_seq = length::read_length(reader)?;
        let _max_deleted_ms = length::read_length(reader)?;
        let _max_deleted_seq = length::read_length(reader)?;
        let _entries_added = length::read_length(reader)?;
    }

    out.push(command(&[
        b"XSETID",
        key,
        format_id(last_ms, last_seq).as_bytes(),
    ]));

    let group_count = length::read_length(reader)?;
    for _ in 0..group_count {
        let group_name = length::read_string(reader)?;
        let group_last_ms = length::read_length(reader)? as i64;
        let group_last_seq = length::read_length(reader)? as i64;
        if has_extended_ids {
            let _entries_read = length::read_length(reader)?;
        }

        skip_global_pel(reader)?;
        skip_consumers(reader, has_extended_ids, has_consumer_active_time)?;

        out.push(command(&[
            b"XGROUP",
            b"CREATE",
            key,
            &group_name,
            format_id(group_last_ms, group_last_seq).as_bytes(),
        ]));
    }

    Ok(out)
}

fn decode_node(blob: &[u8], key: &[u8], master_ms: i64, master_seq: i64) -> RdbResult<Vec<Command>> {
    let items = listpack::decode(blob)?;
    let mut pos = 0usize;
    let parse_i64 = |bytes: &[u8]| -> RdbResult<i64> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| RdbError::malformed("stream listpack integer field was not numeric"))
    };

    let count = parse_i64(next(&items, &mut pos)?)?;
    let deleted = parse_i64(next(&items, &mut pos)?)?;
    let num_master_fields = parse_i64(next(&items, &mut pos)?)?;
    let master_fields: Vec<Vec<u8>> = (0..num_master_fields)
        .map(|_| next(&items, &mut pos).map(<[u8]>::to_vec))
        .collect::<RdbResult<_>>()?;
    let _header_lp_count = next(&items, &mut pos)?;

    let mut out = Vec::new();
    for _ in 0..(count + deleted) {
        let flags = parse_i64(next(&items, &mut pos)?)?;
        let ms_diff = parse_i64(next(&items, &mut pos)?)?;
        let seq_diff = parse_i64(next(&items, &mut pos)?)?;
        let id_ms = master_ms + ms_diff;
        let id_seq = master_seq + seq_diff;

        let fields: Vec<(Vec<u8>, Vec<u8>)> = if flags & FLAG_SAMEFIELDS != 0 {
            let mut pairs = Vec::with_capacity(master_fields.len());
            for field in &master_fields {
                let value = next(&items, &mut pos)?.to_vec();
                pairs.push((field.clone(), value));
            }
            pairs
        } else {
            let num_fields = parse_i64(next(&items, &mut pos)?)?;
            let mut pairs = Vec::with_capacity(num_fields as usize);
            for _ in 0..num_fields {
                let field = next(&items, &mut pos)?.to_vec();
                let value = next(&items, &mut pos)?.to_vec();
                pairs.push((field, value));
            }
            pairs
        };
        let _entry_lp_count = next(&items, &mut pos)?;

        if flags & FLAG_DELETED == 0 {
            let mut argv: Vec<&[u8]> = vec![b"XADD", key, ];
            let id_text = format_id(id_ms, id_seq);
            argv.push(id_text.as_bytes());
            let mut field_bytes = Vec::with_capacity(fields.len() * 2);
            for (field, value) in &fields {
                field_bytes.push(field.as_slice());
                field_bytes.push(value.as_slice());
            }
            argv.extend(field_bytes);
            out.push(command(&argv));
        }
    }
    Ok(out)
}

fn next<'a>(items: &'a [Vec<u8>], pos: &mut usize) -> RdbResult<&'a [u8]> {
    let item = items
        .get(*pos)
        .ok_or_else(|| RdbError::malformed("stream listpack node ended early"))?;
    *pos += 1;
    Ok(item.as_slice())
}

fn format_id(ms: i64, seq: i64) -> String {
    format!("{ms}-{seq}")
}

fn skip_global_pel<R: Read>(reader: &mut R) -> RdbResult<()> {
    let count = length::read_length(reader)?;
    for _ in 0..count {
        let mut id = [0u8; 16];
        reader.read_exact(&mut id)?;
        let _delivery_time_ms = length::read_u64_le(reader)?;
        let _delivery_count = length::read_length(reader)?;
    }
    Ok(())
}

fn skip_consumers<R: Read>(
    reader: &mut R,
    has_extended_ids: bool,
    has_active_time: bool,
) -> RdbResult<()> {
    let consumer_count = length::read_length(reader)?;
    for _ in 0..consumer_count {
        let _name = length::read_string(reader)?;
        let _seen_time_ms = length::read_u64_le(reader)?;
        if has_extended_ids && has_active_time {
            let _active_time_ms = length::read_u64_le(reader)?;
        }
        let pel_count = length::read_length(reader)?;
        for _ in 0..pel_count {
            let mut id = [0u8; 16];
            reader.read_exact(&mut id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Length-prefixes `n` the way `length::read_length` expects, for
    /// values small enough to use the plain 6-bit encoding.
    fn len6(n: u8) -> Vec<u8> {
        assert!(n < 64);
        vec![n]
    }

    /// Length-prefixes `n` using the 14-bit encoding, for values in
    /// `64..=16383` (e.g. a stream ID's millisecond component).
    fn len14(n: u16) -> Vec<u8> {
        vec![0x40 | ((n >> 8) as u8), (n & 0xFF) as u8]
    }

    fn string6(bytes: &[u8]) -> Vec<u8> {
        let mut out = len6(bytes.len() as u8);
        out.extend_from_slice(bytes);
        out
    }

    /// Builds a listpack blob of 6-bit-string entries (each entry here is
    /// short enough that the backlen is always the single-byte form), in
    /// the same shape as the fixture helper in `crate::listpack`'s tests.
    fn build_listpack(entries: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        for entry in entries {
            let len = entry.len();
            assert!(len < 64, "fixture needs the 6-bit string encoding");
            body.push(0x80 | (len as u8));
            body.extend_from_slice(entry);
            body.push(0u8); // backlen, unused by the forward-walking decoder
        }
        body.push(0xFF);
        let mut out = Vec::new();
        out.extend_from_slice(&((6 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// A single rax node (`master_ms=1000, master_seq=0`) holding one live
    /// entry `(ms_diff=0, seq_diff=1)` with same-fields `f1=v1`, one
    /// consumer group at the same last-delivered ID, and empty PELs —
    /// exercises the rax walk, master/delta ID arithmetic, the
    /// same-fields bit, and the group/PEL/consumer skip loops together.
    fn single_entry_single_group_stream() -> Vec<u8> {
        let node_listpack = build_listpack(&[
            b"1",  // count
            b"0",  // deleted
            b"1",  // num_master_fields
            b"f1", // master field name
            b"0",  // header_lp_count (unused)
            b"2",  // entry flags: SAMEFIELDS
            b"0",  // ms_diff
            b"1",  // seq_diff
            b"v1", // value (field name comes from master_fields)
            b"0",  // entry_lp_count (unused)
        ]);

        let mut node_key = Vec::new();
        node_key.extend_from_slice(&1000i64.to_be_bytes());
        node_key.extend_from_slice(&0i64.to_be_bytes());

        let mut body = Vec::new();
        body.extend(len6(1)); // node_count
        body.extend(string6(&node_key));
        body.extend(string6(&node_listpack));

        body.extend(len6(1)); // stream length (discarded)
        body.extend(len14(1000)); // last_ms
        body.extend(len6(1)); // last_seq

        body.extend(len6(1)); // group_count
        body.extend(string6(b"g1"));
        body.extend(len14(1000)); // group_last_ms
        body.extend(len6(1)); // group_last_seq
        body.extend(len6(0)); // global PEL count
        body.extend(len6(0)); // consumer count

        body
    }

    #[test]
    fn decodes_entry_xsetid_and_group_in_order() {
        let body = single_entry_single_group_stream();
        let commands = decode(&mut Cursor::new(body), b"s", opcode::STREAM_LISTPACKS).unwrap();

        assert_eq!(
            commands,
            vec![
                command(&[b"XADD", b"s", b"1000-1", b"f1", b"v1"]),
                command(&[b"XSETID", b"s", b"1000-1"]),
                command(&[b"XGROUP", b"CREATE", b"s", b"g1", b"1000-1"]),
            ]
        );
    }

    #[test]
    fn rejects_rax_node_key_with_wrong_length() {
        let mut body = Vec::new();
        body.extend(len6(1)); // node_count
        body.extend(string6(b"short")); // 5 bytes, not 16
        let err = decode(&mut Cursor::new(body), b"s", opcode::STREAM_LISTPACKS).unwrap_err();
        assert!(matches!(err, RdbError::Malformed(_)));
    }
}
