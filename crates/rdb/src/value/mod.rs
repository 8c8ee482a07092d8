//! Per-value-type decoders. Each produces the command sequence that, when
//! replayed against an empty key, reconstructs the source value — except
//! the leading `DEL <key>`, which the decoder loop always emits itself so
//! every value kind is idempotent against pre-existing state uniformly.

mod hash;
mod list;
mod set;
mod stream;
mod string;
mod zset;

use std::io::Read;

use crate::command::Command;
use crate::error::{RdbError, RdbResult};
use crate::opcode;

/// Dispatches on `type_byte` to the matching value decoder.
pub fn decode<R: Read>(reader: &mut R, key: &[u8], type_byte: u8) -> RdbResult<Vec<Command>> {
    match type_byte {
        opcode::STRING => string::decode(reader, key),
        opcode::LIST | opcode::LIST_ZIPLIST | opcode::LIST_QUICKLIST | opcode::LIST_QUICKLIST_2 => {
            list::decode(reader, key, type_byte)
        }
        opcode::SET | opcode::SET_INTSET | opcode::SET_LISTPACK => {
            set::decode(reader, key, type_byte)
        }
        opcode::ZSET | opcode::ZSET_2 | opcode::ZSET_ZIPLIST | opcode::ZSET_LISTPACK => {
            zset::decode(reader, key, type_byte)
        }
        opcode::HASH
        | opcode::HASH_ZIPLIST
        | opcode::HASH_LISTPACK
        | opcode::HASH_ZIPMAP
        | opcode::HASH_METADATA_PRE_GA
        | opcode::HASH_METADATA
        | opcode::HASH_LISTPACK_EX_PRE_GA
        | opcode::HASH_LISTPACK_EX => hash::decode(reader, key, type_byte),
        opcode::STREAM_LISTPACKS | opcode::STREAM_LISTPACKS_2 | opcode::STREAM_LISTPACKS_3 => {
            stream::decode(reader, key, type_byte)
        }
        opcode::MODULE_PRE_GA | opcode::MODULE_2 => Err(RdbError::unsupported(
            "module-typed keys cannot be reconstructed without the module",
        )),
        other => Err(RdbError::malformed(format!(
            "unrecognized value type byte {other}"
        ))),
    }
}
