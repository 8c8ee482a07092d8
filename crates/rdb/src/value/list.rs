use std::io::Read;

use crate::command::{command, Command};
use crate::error::{RdbError, RdbResult};
use crate::length;
use crate::listpack;
use crate::opcode;
use crate::ziplist;

/// Decodes any of the list-shaped value types into an ordered sequence of
/// `RPUSH key elem` commands, preserving head-to-tail order.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    let elements = match type_byte {
        opcode::LIST => read_linked(reader)?,
        opcode::LIST_ZIPLIST => ziplist::decode(&length::read_string(reader)?)?,
        opcode::LIST_QUICKLIST => read_quicklist(reader)?,
        opcode::LIST_QUICKLIST_2 => read_quicklist2(reader)?,
        other => {
            return Err(RdbError::malformed(format!(
                "type byte {other} is not a list encoding"
            )))
        }
    };
    Ok(elements
        .into_iter()
        .map(|elem| command(&[b"RPUSH", key, &elem]))
        .collect())
}

fn read_linked<R: Read>(reader: &mut R) -> RdbResult<Vec<Vec<u8>>> {
    let count = length::read_length(reader)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(length::read_string(reader)?);
    }
    Ok(out)
}

fn read_quicklist<R: Read>(reader: &mut R) -> RdbResult<Vec<Vec<u8>>> {
    let node_count = length::read_length(reader)?;
    let mut out = Vec::new();
    for _ in 0..node_count {
        let node = length::read_string(reader)?;
        out.extend(ziplist::decode(&node)?);
    }
    Ok(out)
}

fn read_quicklist2<R: Read>(reader: &mut R) -> RdbResult<Vec<Vec<u8>>> {
    let node_count = length::read_length(reader)?;
    let mut out = Vec::new();
    for _ in 0..node_count {
        let container = length::read_length(reader)?;
        let node = length::read_string(reader)?;
        match container {
            opcode::QUICKLIST_NODE_CONTAINER_PLAIN => out.push(node),
            opcode::QUICKLIST_NODE_CONTAINER_PACKED => out.extend(listpack::decode(&node)?),
            other => {
                return Err(RdbError::malformed(format!(
                    "unknown quicklist-2 node container tag {other}"
                )))
            }
        }
    }
    Ok(out)
}
