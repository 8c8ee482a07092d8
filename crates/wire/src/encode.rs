use std::io::{self, Write};

use crate::error::WireResult;

/// Writes `argv` as a RESP array of binary-safe bulk strings.
///
/// This is the only shape this workspace ever writes: handshake commands
/// (`PING`, `REPLCONF ...`, `PSYNC ...`) and the `REPLCONF ACK <offset>`
/// heartbeat are all plain command arrays, never inline commands or
/// pipelined replies.
pub fn write_command<W: Write>(writer: &mut W, argv: &[&[u8]]) -> WireResult<()> {
    write!(writer, "*{}\r\n", argv.len()).map_err(wrap)?;
    for arg in argv {
        write!(writer, "${}\r\n", arg.len()).map_err(wrap)?;
        writer.write_all(arg).map_err(wrap)?;
        writer.write_all(b"\r\n").map_err(wrap)?;
    }
    Ok(())
}

fn wrap(error: io::Error) -> crate::error::WireError {
    crate::error::WireError::Io(error)
}
