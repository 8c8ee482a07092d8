#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A small bridge between this workspace's verbosity model and `tracing`:
//! [`init`] installs a global subscriber from a [`Verbosity`] level (or
//! `RUST_LOG`, if set), and [`session_span`] tags every log line a
//! replication session emits with its session id.
//!
//! Every task in a replication session (the network reader, the snapshot
//! decoder, the ack loop, the spool reader, the command-stream parser)
//! should run inside the span [`session_span`] returns, so a single
//! `session_id` field ties its log lines together regardless of which
//! thread emitted them.

use tracing_subscriber::EnvFilter;

/// How much this workspace logs, from quietest to loudest.
///
/// `error` for fatal session aborts, `warn` for retryable conditions (a
/// source that refused diskless transfer, a bgsave still in progress),
/// `info` for phase transitions, `debug` for per-opcode and per-command
/// tracing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Only fatal session aborts.
    Quiet,
    /// Phase transitions and warnings. The default.
    #[default]
    Normal,
    /// Phase transitions, warnings, and this crate's own debug spans.
    Verbose,
    /// Every log line this workspace emits, including per-opcode decode
    /// tracing.
    Debug,
}

impl Verbosity {
    fn filter_directives(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "info,wire=debug,rdb=debug,spool=debug,stream=debug,session=debug,replicore=debug",
            Verbosity::Debug => "debug",
        }
    }
}

/// Installs a global `tracing` subscriber writing formatted lines to
/// stderr.
///
/// `RUST_LOG`, if set, overrides `verbosity` entirely, the same
/// precedence an explicit environment override takes over a flag
/// default. Calling this more than once in a process is harmless; only
/// the first call installs a subscriber.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directives()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Opens a span tagging every log line emitted under it with `session_id`.
///
/// A caller running `replicore::run_session` wraps the call (and every
/// task it spawns) in this span's guard so `connect`, `handshake`,
/// `snapshot decode`, and `stream parse` log lines from different threads
/// can all be correlated back to one session.
#[must_use]
pub fn session_span(session_id: u64) -> tracing::Span {
    tracing::info_span!("replication_session", session_id)
}
