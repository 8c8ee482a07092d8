//! crates/session/src/psync.rs
//!
//! Issues `PSYNC`/`SYNC` and parses the source's resync reply.

use crate::error::{SessionError, SessionResult};
use crate::handshake::call;
use crate::options::ResumeOffset;
use crate::transport::ReadWrite;

/// What the source told us to do after a resync request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ResyncReply {
    /// `+FULLRESYNC <replid> <offset>`: a full snapshot follows.
    FullResync { replid: String, offset: i64 },
    /// `+CONTINUE <replid>?`: the source is replaying from our last
    /// offset; no snapshot follows. `replid` is `None` when the source
    /// omits it (pre-4.0 behavior), meaning it didn't change.
    Continue { replid: Option<String> },
}

/// Sends `PSYNC ? -1` (no prior offset to resume from) or
/// `PSYNC <replid> <offset>` (attempting a partial resync), and parses the
/// reply.
///
/// # Errors
///
/// Returns [`SessionError::Protocol`] if the source's reply doesn't match
/// either known form.
pub(crate) fn psync(stream: &mut dyn ReadWrite, resume: Option<&ResumeOffset>) -> SessionResult<ResyncReply> {
    let (replid_arg, offset_arg) = match resume {
        Some(resume) => (resume.replid.clone(), resume.offset.to_string()),
        None => ("?".to_owned(), "-1".to_owned()),
    };
    let reply = call(stream, &[b"PSYNC", replid_arg.as_bytes(), offset_arg.as_bytes()])?;
    parse_resync_reply(reply)
}

/// Sends the legacy `SYNC` command, used against sources too old to speak
/// `PSYNC` (`redis_version` major*1000+minor < 2008). `SYNC` has no partial
/// resync concept: every call is a full snapshot transfer and carries no
/// reply line of its own — the snapshot payload follows immediately.
///
/// # Errors
///
/// Returns [`SessionError::Wire`] if the command can't be written.
pub(crate) fn sync(stream: &mut dyn ReadWrite) -> SessionResult<()> {
    wire::write_command(stream, &[b"SYNC"]).map_err(SessionError::from)
}

fn parse_resync_reply(reply: wire::Reply) -> SessionResult<ResyncReply> {
    let text = match reply {
        wire::Reply::Simple(text) => text,
        wire::Reply::Error(message) => return Err(SessionError::protocol(format!("PSYNC rejected: {message}"))),
        other => return Err(SessionError::protocol(format!("unexpected PSYNC reply: {other:?}"))),
    };

    let mut fields = text.split_whitespace();
    match fields.next() {
        Some("FULLRESYNC") => {
            let replid = fields
                .next()
                .ok_or_else(|| SessionError::protocol("FULLRESYNC reply missing replid"))?
                .to_owned();
            let offset = fields
                .next()
                .ok_or_else(|| SessionError::protocol("FULLRESYNC reply missing offset"))?
                .parse()
                .map_err(|_| SessionError::protocol("FULLRESYNC reply offset is not an integer"))?;
            Ok(ResyncReply::FullResync { replid, offset })
        }
        Some("CONTINUE") => Ok(ResyncReply::Continue {
            replid: fields.next().map(str::to_owned),
        }),
        _ => Err(SessionError::protocol(format!("unrecognized PSYNC reply: {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fullresync_reply() {
        let reply = wire::Reply::Simple("FULLRESYNC a1b2c3 100".to_owned());
        assert_eq!(
            parse_resync_reply(reply).unwrap(),
            ResyncReply::FullResync {
                replid: "a1b2c3".to_owned(),
                offset: 100,
            }
        );
    }

    #[test]
    fn parses_continue_reply_with_replid() {
        let reply = wire::Reply::Simple("CONTINUE a1b2c3".to_owned());
        assert_eq!(
            parse_resync_reply(reply).unwrap(),
            ResyncReply::Continue {
                replid: Some("a1b2c3".to_owned()),
            }
        );
    }

    #[test]
    fn parses_continue_reply_without_replid() {
        let reply = wire::Reply::Simple("CONTINUE".to_owned());
        assert_eq!(parse_resync_reply(reply).unwrap(), ResyncReply::Continue { replid: None });
    }

    #[test]
    fn rejects_error_reply() {
        let reply = wire::Reply::Error("ERR Can't SYNC".to_owned());
        assert!(parse_resync_reply(reply).is_err());
    }

    #[test]
    fn rejects_unrecognized_reply() {
        let reply = wire::Reply::Simple("OK".to_owned());
        assert!(parse_resync_reply(reply).is_err());
    }
}
