#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `wire` implements the length-prefixed array protocol spoken by a Redis
//! (or Redis-compatible) source during replication: simple strings, errors,
//! integers, binary-safe bulk strings, and arrays of replies, each framed by
//! a type prefix byte and a `\r\n`-terminated length or payload.
//!
//! # Design
//!
//! The crate is split into two small modules:
//!
//! - [`decode`] reads a [`Reply`] or a command's `argv` off any [`std::io::Read`],
//!   tolerating the bare `\n` keepalive bytes a source emits while a
//!   background save is running.
//! - [`encode`] writes commands as RESP arrays of bulk strings, the only
//!   shape this workspace ever needs to send.
//!
//! Both directions share [`decode::skip_inline_newlines`], since the same
//! "ignore leading newlines" rule applies to the handshake acknowledgement
//! and to the RDB length/marker line that precedes a snapshot transfer.
//!
//! # Invariants
//!
//! - Bulk and array replies distinguish "null" (`$-1`, `*-1`) from "empty"
//!   (`$0\r\n\r\n`, `*0\r\n`); callers that need the distinction can observe
//!   it directly in [`Reply`].
//! - A reply frame is decoded only once its terminating `\r\n` (or nested
//!   frames, for arrays) has been consumed in full — a short read always
//!   surfaces as [`error::WireError::UnexpectedEof`], never a partial value.
//!
//! # Errors
//!
//! All fallible operations return [`error::WireResult`]; see
//! [`error::WireError`] for the variants.

pub mod decode;
pub mod encode;
mod entry;
pub mod error;
mod reply;

pub use decode::{read_command, read_reply, skip_inline_newlines};
pub use encode::write_command;
pub use entry::Entry;
pub use error::{WireError, WireResult};
pub use reply::Reply;
