#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `replicore` is the root orchestration crate: it owns no protocol or
//! decoding logic of its own, and instead wires `session` (C2), `rdb`
//! (C3), `spool` (C4), and `stream` (C5) into the single
//! [`run_session`] library entry point, this core's only external
//! surface.
//!
//! # Design
//!
//! [`run_session`] runs the handshake-through-snapshot-drain sequence on
//! the calling thread via `session::connect`, which itself starts the
//! live-stream drain (T1, the network reader; T3, the ack loop) on a
//! background thread before returning. From there:
//!
//! - If a snapshot was transferred, a dedicated thread (T2) decodes it
//!   through `rdb`, and the calling thread forwards the resulting entries
//!   to the caller's sink as they arrive — this loop is what enforces
//!   "every snapshot-derived command before any live-stream command",
//!   without blocking T1's write into the spool.
//! - Once the snapshot (if any) is fully forwarded, a dedicated thread
//!   (T4) follows the spool through `stream::run`, and the calling thread
//!   forwards those entries to the sink in turn.
//!
//! Re-exports from each component crate are kept to the handful of types a
//! caller needs to construct a session and consume its output; the
//! components' internal machinery stays private to their own crates.
//!
//! # Errors
//!
//! All fallible operations return [`error::ReplicationResult`]; see
//! [`error::ReplicationError`] for the variants. Cancellation via a
//! [`spool::CancelToken`] shared with the caller is a clean shutdown, not
//! an error.

pub mod error;
mod pipeline;

pub use error::{ReplicationError, ReplicationResult};
pub use pipeline::run_session;
pub use session::{
    AuthCredentials, Options, OptionsBuilder, OptionsError, ResumeOffset, SessionStats, SessionStatus, SourceAddress,
    TlsOptions,
};
pub use logging::{session_span, Verbosity};
pub use spool::CancelToken;
pub use wire::Entry;
