use std::io::Read;

use crate::command::{command, Command};
use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::listpack;
use crate::opcode;
use crate::ziplist;

/// Decodes any of the sorted-set-shaped value types into an ordered
/// sequence of `ZADD key score member` commands.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    match type_byte {
        opcode::ZSET => read_scored(reader, length::read_float),
        opcode::ZSET_2 => read_scored(reader, length::read_double),
        opcode::ZSET_ZIPLIST => read_interleaved(ziplist::decode(&length::read_string(reader)?)?),
        opcode::ZSET_LISTPACK => read_interleaved(listpack::decode(&length::read_string(reader)?)?),
        other => Err(RdbError::malformed(format!(
            "type byte {other} is not a sorted-set encoding"
        ))),
    }
    .map(|pairs| {
        pairs
            .into_iter()
            .map(|(member, score)| command(&[b"ZADD", key, score.as_bytes(), &member]))
            .collect()
    })
}

fn read_scored<R: Read>(
    reader: &mut R,
    mut read_score: impl FnMut(&mut R) -> RdbResult<f64>,
) -> RdbResult<Vec<(Vec<u8>, String)>> {
    let count = length::read_length(reader)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let member = length::read_string(reader)?;
        let score = read_score(reader)?;
        out.push((member, length::format_score(score)));
    }
    Ok(out)
}

fn read_interleaved(items: Vec<Vec<u8>>) -> RdbResult<Vec<(Vec<u8>, String)>> {
    if items.len() % 2 != 0 {
        return Err(RdbError::malformed(
            "sorted-set ziplist/listpack entry count is not even",
        ));
    }
    Ok(items
        .chunks_exact(2)
        .map(|pair| {
            let member = pair[0].clone();
            let score = String::from_utf8_lossy(&pair[1]).into_owned();
            (member, score)
        })
        .collect())
}
