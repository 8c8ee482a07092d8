use std::io::{self, Read};

use crate::error::{WireError, WireResult};
use crate::reply::Reply;

/// Reads and discards any number of leading `\n` filler bytes.
///
/// The source emits bare `\n` bytes as keepalives while a background save is
/// running, interleaved ahead of the next real reply. Every top-level read in
/// this crate and in the replication session goes through this helper first
/// so the two call sites (the `PSYNC`/`SYNC` acknowledgement and the RDB
/// length/marker line) share one implementation.
pub fn skip_inline_newlines<R: Read>(reader: &mut R) -> WireResult<u8> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(WireError::UnexpectedEof);
            }
            Err(error) => return Err(WireError::Io(error)),
        }
        if byte[0] != b'\n' {
            return Ok(byte[0]);
        }
    }
}

/// Reads one reply frame from `reader`, tolerating leading `\n` filler bytes.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] when the stream ends mid-frame and
/// [`WireError::Protocol`] when a prefix byte, length, or terminator does
/// not match the expected framing grammar.
pub fn read_reply<R: Read>(reader: &mut R) -> WireResult<Reply> {
    let prefix = skip_inline_newlines(reader)?;
    read_reply_with_prefix(reader, prefix)
}

fn read_reply_with_prefix<R: Read>(reader: &mut R, prefix: u8) -> WireResult<Reply> {
    match prefix {
        b'+' => Ok(Reply::Simple(read_line(reader)?)),
        b'-' => Ok(Reply::Error(read_line(reader)?)),
        b':' => {
            let line = read_line(reader)?;
            let value = line
                .parse::<i64>()
                .map_err(|_| WireError::protocol(format!("invalid integer reply: {line:?}")))?;
            Ok(Reply::Integer(value))
        }
        b'$' => read_bulk(reader),
        b'*' => read_array(reader),
        other => Err(WireError::protocol(format!(
            "unexpected reply prefix byte {other:#04x}"
        ))),
    }
}

fn read_bulk<R: Read>(reader: &mut R) -> WireResult<Reply> {
    let len = read_signed_length(reader)?;
    if len < 0 {
        return Ok(Reply::Bulk(None));
    }
    let len = len as usize;
    let mut payload = vec![0u8; len];
    read_exact_or_eof(reader, &mut payload)?;
    let mut crlf = [0u8; 2];
    read_exact_or_eof(reader, &mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(WireError::protocol("bulk reply missing trailing CRLF"));
    }
    Ok(Reply::Bulk(Some(payload)))
}

fn read_array<R: Read>(reader: &mut R) -> WireResult<Reply> {
    let len = read_signed_length(reader)?;
    if len < 0 {
        return Ok(Reply::Array(None));
    }
    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        items.push(read_reply(reader)?);
    }
    Ok(Reply::Array(Some(items)))
}

fn read_signed_length<R: Read>(reader: &mut R) -> WireResult<i64> {
    let line = read_line(reader)?;
    line.parse::<i64>()
        .map_err(|_| WireError::protocol(format!("invalid length prefix: {line:?}")))
}

fn read_line<R: Read>(reader: &mut R) -> WireResult<String> {
    let mut bytes = Vec::with_capacity(32);
    let mut byte = [0u8; 1];
    loop {
        read_exact_or_eof(reader, &mut byte)?;
        if byte[0] == b'\n' {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            break;
        }
        bytes.push(byte[0]);
    }
    String::from_utf8(bytes).map_err(|error| {
        WireError::protocol(format!("reply line is not valid UTF-8: {error}"))
    })
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> WireResult<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            Err(WireError::UnexpectedEof)
        }
        Err(error) => Err(WireError::Io(error)),
    }
}

/// Reads one command's `argv` from a byte stream already known to contain a
/// top-level array of bulk strings (the shape the source and the spool both
/// use for commands). Non-bulk elements are rejected.
///
/// # Errors
///
/// Returns [`WireError::Protocol`] if the top-level reply is not an array of
/// bulk strings, and [`WireError::UnexpectedEof`] at a genuine stream end.
pub fn read_command<R: Read>(reader: &mut R) -> WireResult<Vec<Vec<u8>>> {
    match read_reply(reader)? {
        Reply::Array(Some(items)) => items
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(Some(bytes)) => Ok(bytes),
                other => Err(WireError::protocol(format!(
                    "command array element was not a bulk string: {other:?}"
                ))),
            })
            .collect(),
        other => Err(WireError::protocol(format!(
            "expected a command array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_simple_string() {
        let mut cursor = Cursor::new(b"+OK\r\n".to_vec());
        assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Simple("OK".into()));
    }

    #[test]
    fn decodes_error() {
        let mut cursor = Cursor::new(b"-ERR bad thing\r\n".to_vec());
        assert_eq!(
            read_reply(&mut cursor).unwrap(),
            Reply::Error("ERR bad thing".into())
        );
    }

    #[test]
    fn decodes_integer() {
        let mut cursor = Cursor::new(b":1000\r\n".to_vec());
        assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Integer(1000));
    }

    #[test]
    fn decodes_negative_integer() {
        let mut cursor = Cursor::new(b":-5\r\n".to_vec());
        assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Integer(-5));
    }

    #[test]
    fn decodes_bulk_string_binary_safe() {
        let mut payload = b"$5\r\n".to_vec();
        payload.extend_from_slice(b"a\r\n\0b");
        payload.extend_from_slice(b"\r\n");
        let mut cursor = Cursor::new(payload);
        assert_eq!(
            read_reply(&mut cursor).unwrap(),
            Reply::Bulk(Some(b"a\r\n\0b".to_vec()))
        );
    }

    #[test]
    fn decodes_null_bulk() {
        let mut cursor = Cursor::new(b"$-1\r\n".to_vec());
        assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Bulk(None));
    }

    #[test]
    fn decodes_null_array() {
        let mut cursor = Cursor::new(b"*-1\r\n".to_vec());
        assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Array(None));
    }

    #[test]
    fn decodes_nested_array() {
        let mut cursor = Cursor::new(b"*2\r\n$3\r\nSET\r\n$1\r\nk\r\n".to_vec());
        let reply = read_reply(&mut cursor).unwrap();
        let items = reply.as_array().unwrap();
        assert_eq!(items[0].as_bulk(), Some(b"SET".as_slice()));
        assert_eq!(items[1].as_bulk(), Some(b"k".as_slice()));
    }

    #[test]
    fn skips_leading_newline_filler() {
        let mut cursor = Cursor::new(b"\n\n\n+PONG\r\n".to_vec());
        assert_eq!(
            read_reply(&mut cursor).unwrap(),
            Reply::Simple("PONG".into())
        );
    }

    #[test]
    fn fails_on_bad_prefix() {
        let mut cursor = Cursor::new(b"!oops\r\n".to_vec());
        assert!(matches!(
            read_reply(&mut cursor).unwrap_err(),
            WireError::Protocol(_)
        ));
    }

    #[test]
    fn fails_on_truncated_bulk() {
        let mut cursor = Cursor::new(b"$10\r\nabc".to_vec());
        assert!(matches!(
            read_reply(&mut cursor).unwrap_err(),
            WireError::UnexpectedEof
        ));
    }

    #[test]
    fn reads_command_argv() {
        let mut cursor = Cursor::new(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n".to_vec());
        let argv = read_command(&mut cursor).unwrap();
        assert_eq!(argv, vec![b"GET".to_vec(), b"k".to_vec()]);
    }

    #[test]
    fn rejects_command_with_non_bulk_element() {
        let mut cursor = Cursor::new(b"*1\r\n:5\r\n".to_vec());
        assert!(matches!(
            read_command(&mut cursor).unwrap_err(),
            WireError::Protocol(_)
        ));
    }
}
