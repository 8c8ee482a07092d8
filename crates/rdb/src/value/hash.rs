use std::io::Read;

use crate::command::{command, Command};
use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::listpack;
use crate::opcode;
use crate::ziplist;

/// Decodes any of the hash-shaped value types, including the per-field-TTL
/// variants, into `HSET`/`HPEXPIREAT` command sequences.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    match type_byte {
        opcode::HASH => read_plain(reader, key),
        opcode::HASH_ZIPLIST => read_interleaved(ziplist::decode(&length::read_string(reader)?)?, key),
        opcode::HASH_LISTPACK => {
            read_interleaved(listpack::decode(&length::read_string(reader)?)?, key)
        }
        opcode::HASH_ZIPMAP => Err(RdbError::unsupported("hash zipmap encoding")),
        opcode::HASH_METADATA_PRE_GA => read_ttl_plain(reader, key, false),
        opcode::HASH_METADATA => read_ttl_plain(reader, key, true),
        opcode::HASH_LISTPACK_EX_PRE_GA => read_ttl_listpack(reader, key, false),
        opcode::HASH_LISTPACK_EX => read_ttl_listpack(reader, key, true),
        other => Err(RdbError::malformed(format!(
            "type byte {other} is not a hash encoding"
        ))),
    }
}

fn read_plain<R: Read>(reader: &mut R, key: &[u8]) -> RdbResult<Vec<Command>> {
    let count = length::read_length(reader)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let field = length::read_string(reader)?;
        let value = length::read_string(reader)?;
        out.push(command(&[b"HSET", key, &field, &value]));
    }
    Ok(out)
}

fn read_interleaved(items: Vec<Vec<u8>>, key: &[u8]) -> RdbResult<Vec<Command>> {
    if items.len() % 2 != 0 {
        return Err(RdbError::malformed(
            "hash ziplist/listpack entry count is not even",
        ));
    }
    Ok(items
        .chunks_exact(2)
        .map(|pair| command(&[b"HSET", key, &pair[0], &pair[1]]))
        .collect())
}

/// `RDB_TYPE_HASH_METADATA[_PRE_GA]`: plain field/value pairs, each preceded
/// by a length-encoded expire time. In the GA layout the expire is a delta
/// from a leading `min_expire`; in the pre-GA layout it is already absolute.
fn read_ttl_plain<R: Read>(reader: &mut R, key: &[u8], ga_layout: bool) -> RdbResult<Vec<Command>> {
    let min_expire = if ga_layout {
        length::read_u64_le(reader)?
    } else {
        0
    };
    let count = length::read_length(reader)?;
    let mut out = Vec::with_capacity(count as usize * 2);
    for _ in 0..count {
        let raw_expire = length::read_length(reader)?;
        let expire_at = resolve_expire(raw_expire, min_expire, ga_layout);
        let field = length::read_string(reader)?;
        let value = length::read_string(reader)?;
        out.push(command(&[b"HSET", key, &field, &value]));
        if expire_at != 0 {
            out.push(hpexpireat(key, expire_at, &field));
        }
    }
    Ok(out)
}

/// `RDB_TYPE_HASH_LISTPACK_EX[_PRE_GA]`: a single listpack with
/// `(field, value, expire)` triples, optionally preceded by a `min_expire`
/// in the GA layout that this listpack encoding reads past but never uses:
/// unlike `HASH_METADATA`'s plain encoding, each triple's `expire` here is
/// already an absolute millisecond timestamp, not a delta.
fn read_ttl_listpack<R: Read>(
    reader: &mut R,
    key: &[u8],
    ga_layout: bool,
) -> RdbResult<Vec<Command>> {
    if ga_layout {
        let _min_expire = length::read_u64_le(reader)?;
    }
    let items = listpack::decode(&length::read_string(reader)?)?;
    if items.len() % 3 != 0 {
        return Err(RdbError::malformed(
            "hash listpack-ex entry count is not a multiple of three",
        ));
    }
    let mut out = Vec::with_capacity(items.len());
    for triple in items.chunks_exact(3) {
        let field = &triple[0];
        let value = &triple[1];
        let expire_at: u64 = std::str::from_utf8(&triple[2])
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| RdbError::malformed("hash listpack-ex expire field is not an integer"))?;
        out.push(command(&[b"HSET", key, field, value]));
        if expire_at != 0 {
            out.push(hpexpireat(key, expire_at, field));
        }
    }
    Ok(out)
}

/// Per `spec.md` §4.3: `HASH_METADATA`'s plain (non-listpack) encoding
/// carries each field's expire as a delta from the leading `min_expire`,
/// with a delta of `0` meaning "no expire" rather than
/// `min_expire - 1`. `HASH_LISTPACK_EX` does not use this function — its
/// triples already carry an absolute expire, per `read_ttl_listpack`.
fn resolve_expire(raw: u64, min_expire: u64, ga_layout: bool) -> u64 {
    if !ga_layout || raw == 0 {
        raw
    } else {
        min_expire + raw - 1
    }
}

fn hpexpireat(key: &[u8], expire_at_ms: u64, field: &[u8]) -> Command {
    command(&[
        b"HPEXPIREAT",
        key,
        expire_at_ms.to_string().as_bytes(),
        b"FIELDS",
        b"1",
        field,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ga_layout_delta_zero_means_no_expire() {
        assert_eq!(resolve_expire(0, 1_000_000, true), 0);
    }

    #[test]
    fn ga_layout_delta_resolves_relative_to_min_expire() {
        assert_eq!(resolve_expire(500, 1_000_000, true), 1_000_499);
    }

    #[test]
    fn pre_ga_layout_is_already_absolute() {
        assert_eq!(resolve_expire(1_000_499, 0, false), 1_000_499);
    }

    /// Builds a minimal listpack blob of 6-bit-string entries, matching the
    /// fixture helper in `crate::listpack`'s own tests.
    fn build_listpack(entries: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        for entry in entries {
            let len = entry.len();
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

    /// Length-prefixes `blob` the way `length::read_string` expects.
    fn length_prefixed(blob: &[u8]) -> Vec<u8> {
        assert!(blob.len() < 64, "fixture needs the 6-bit length encoding");
        let mut out = vec![blob.len() as u8];
        out.extend_from_slice(blob);
        out
    }

    #[test]
    fn ga_layout_listpack_expire_is_absolute_not_delta_from_min_expire() {
        // A GA-layout `min_expire` of 1_000_000 must NOT shift this
        // listpack's own expire value — only `HASH_METADATA`'s plain
        // encoding (`read_ttl_plain`/`resolve_expire`) applies that
        // delta-from-min_expire rule.
        let listpack = build_listpack(&[b"f", b"v", b"1000499"]);
        let mut input = Vec::new();
        input.extend_from_slice(&1_000_000u64.to_le_bytes());
        input.extend_from_slice(&length_prefixed(&listpack));

        let commands = read_ttl_listpack(&mut Cursor::new(input), b"h", true).unwrap();

        assert_eq!(
            commands,
            vec![
                command(&[b"HSET", b"h", b"f", b"v"]),
                command(&[b"HPEXPIREAT", b"h", b"1000499", b"FIELDS", b"1", b"f"]),
            ]
        );
    }

    #[test]
    fn listpack_expire_zero_emits_no_hpexpireat() {
        let listpack = build_listpack(&[b"f", b"v", b"0"]);
        // pre-GA layout: no leading min_expire field at all.
        let input = length_prefixed(&listpack);
        let commands = read_ttl_listpack(&mut Cursor::new(input), b"h", false).unwrap();
        assert_eq!(commands, vec![command(&[b"HSET", b"h", b"f", b"v"])]);
    }
}
