//! crates/session/src/handshake.rs
//!
//! Steps 1-3 of `spec.md` §4.2: connect, authenticate, declare capabilities,
//! and wait out any bgsave/AOF rewrite already running on the source before
//! requesting a resync.

use std::io::Write;
use std::thread;
use std::time::Duration;

use spool::CancelToken;
use wire::Reply;

use crate::error::{SessionError, SessionResult};
use crate::options::AuthCredentials;
use crate::transport::ReadWrite;

/// How long to sleep between `INFO persistence` polls while a bgsave or AOF
/// rewrite is already running on the source.
const BGSAVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Sends a command and reads back one reply, tolerating leading `\n`
/// keepalive filler exactly as `spec.md` §4.1 requires.
pub(crate) fn call(stream: &mut dyn ReadWrite, argv: &[&[u8]]) -> SessionResult<Reply> {
    wire::write_command(stream, argv).map_err(SessionError::from)?;
    stream.flush()?;
    wire::read_reply(stream).map_err(SessionError::from)
}

/// `PING` and expect `+PONG`.
///
/// # Errors
///
/// Returns [`SessionError::Protocol`] if the reply isn't a `PONG` simple
/// string.
pub(crate) fn ping(stream: &mut dyn ReadWrite) -> SessionResult<()> {
    match call(stream, &[b"PING"])? {
        Reply::Simple(text) if text.eq_ignore_ascii_case("PONG") => Ok(()),
        other => Err(SessionError::protocol(format!(
            "expected PONG, got {other:?}"
        ))),
    }
}

/// `AUTH <username>? <password>`.
///
/// # Errors
///
/// Returns [`SessionError::Protocol`] if the source rejects the credentials.
pub(crate) fn authenticate(stream: &mut dyn ReadWrite, auth: &AuthCredentials) -> SessionResult<()> {
    let reply = match &auth.username {
        Some(username) => call(stream, &[b"AUTH", username.as_bytes(), auth.password().as_bytes()])?,
        None => call(stream, &[b"AUTH", auth.password().as_bytes()])?,
    };
    match reply {
        Reply::Simple(text) if text.eq_ignore_ascii_case("OK") => Ok(()),
        Reply::Error(message) => Err(SessionError::protocol(format!("AUTH rejected: {message}"))),
        other => Err(SessionError::protocol(format!(
            "unexpected AUTH reply: {other:?}"
        ))),
    }
}

/// `REPLCONF listening-port <port>`. The reply is ignored per `spec.md`
/// §4.2 step 2.
pub(crate) fn declare_listening_port(stream: &mut dyn ReadWrite, port: u16) -> SessionResult<()> {
    call(stream, &[b"REPLCONF", b"listening-port", port.to_string().as_bytes()])?;
    Ok(())
}

/// `REPLCONF CAPA EOF`, returning whether diskless transfer was accepted.
///
/// A non-`OK` reply disables diskless mode for this session rather than
/// failing it outright — `spec.md` §4.2 step 2 treats this as a capability
/// negotiation, not a hard requirement.
pub(crate) fn declare_diskless_capability(stream: &mut dyn ReadWrite) -> SessionResult<bool> {
    match call(stream, &[b"REPLCONF", b"CAPA", b"EOF"])? {
        Reply::Simple(text) if text.eq_ignore_ascii_case("OK") => Ok(true),
        _ => Ok(false),
    }
}

/// `INFO <section>`, returning the bulk reply's text.
pub(crate) fn info(stream: &mut dyn ReadWrite, section: &str) -> SessionResult<String> {
    match call(stream, &[b"INFO", section.as_bytes()])? {
        Reply::Bulk(Some(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned(),),
        other => Err(SessionError::protocol(format!(
            "unexpected INFO {section} reply: {other:?}"
        ))),
    }
}

/// Polls `INFO persistence` every [`BGSAVE_POLL_INTERVAL`] while a bgsave or
/// AOF rewrite is already running on the source, per `spec.md` §4.2 step 3.
///
/// # Errors
///
/// Returns [`SessionError::Cancelled`] if `cancel` fires mid-poll.
pub(crate) fn wait_for_bgsave(stream: &mut dyn ReadWrite, cancel: &CancelToken) -> SessionResult<()> {
    loop {
        let text = info(stream, "persistence")?;
        if !info_flag_set(&text, "rdb_bgsave_in_progress") && !info_flag_set(&text, "aof_rewrite_in_progress") {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        thread::sleep(BGSAVE_POLL_INTERVAL);
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
    }
}

fn info_flag_set(info_text: &str, key: &str) -> bool {
    info_text
        .lines()
        .find_map(|line| line.strip_prefix(key).and_then(|rest| rest.strip_prefix(':')))
        .map(str::trim)
        == Some("1")
}

/// Parses `INFO server`'s `redis_version:` line and decides whether the
/// source is new enough to speak `PSYNC` (2.8.0+), falling back to the
/// legacy `SYNC` command otherwise.
///
/// Grounded on the Go original's `supportPSync()`: `major*1000+minor < 2008`
/// means legacy `SYNC`.
pub(crate) fn supports_psync(stream: &mut dyn ReadWrite) -> SessionResult<bool> {
    let text = info(stream, "server")?;
    let version = text
        .lines()
        .find_map(|line| line.strip_prefix("redis_version:"))
        .map(str::trim);
    let Some(version) = version else {
        // Some Redis-compatible sources omit this field; assume a modern
        // source rather than fail the session outright.
        return Ok(true);
    };
    let mut parts = version.split('.');
    let major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Ok(major * 1000 + minor >= 2008)
}

/// Parses `INFO replication`'s `slaveN:` lines and returns the `(ip, port)`
/// of the replica reporting the largest `offset`, used when
/// [`crate::options::Options::prefer_replica`] is set.
pub(crate) fn best_replica(info_text: &str) -> Option<(String, u16)> {
    info_text
        .lines()
        .filter(|line| line.starts_with("slave"))
        .filter_map(|line| {
            let fields = line.split_once(':')?.1;
            let mut ip = None;
            let mut port = None;
            let mut offset: i64 = -1;
            for field in fields.split(',') {
                let (key, value) = field.split_once('=')?;
                match key {
                    "ip" => ip = Some(value.to_owned()),
                    "port" => port = value.parse().ok(),
                    "offset" => offset = value.parse().unwrap_or(-1),
                    _ => {}
                }
            }
            Some((ip?, port?, offset))
        })
        .max_by_key(|(_, _, offset)| *offset)
        .map(|(ip, port, _)| (ip, port))
}
