use std::io::Read;

use crate::command::{command, Command};
use crate::error::RdbResult;
use crate::length;

/// `RDB_TYPE_STRING`: a single `SET key value` reconstruction.
pub fn decode<R: Read>(reader: &mut R, key: &[u8]) -> RdbResult<Vec<Command>> {
    let value = length::read_string(reader)?;
    Ok(vec![command(&[b"SET", key, &value])])
}
