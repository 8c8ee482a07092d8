use std::io::Read;

use crate::command::{command, Command};
use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::listpack;
use crate::opcode;
use crate::ziplist;

/// Decodes any of the set-shaped value types into an ordered sequence of
/// `SADD key member` commands.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    let members = match type_byte {
        opcode::SET => read_plain(reader)?,
        opcode::SET_INTSET => ziplist::decode_intset(&length::read_string(reader)?)?,
        opcode::SET_LISTPACK => listpack::decode(&length::read_string(reader)?)?,
        other => {
            return Err(RdbError::malformed(format!(
                "type byte {other} is not a set encoding"
            )))
        }
    };
    Ok(members
        .into_iter()
        .map(|member| command(&[b"SADD", key, &member]))
        .collect())
}

fn read_plain<R: Read>(reader: &mut R) -> RdbResult<Vec<Vec<u8>>> {
    let count = length::read_length(reader)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(length::read_string(reader)?);
    }
    Ok(out)
}
