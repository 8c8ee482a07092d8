#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `stream` is the command-stream parser: it wraps a [`spool::SpoolReader`]
//! in the wire codec's command decoder, normalizes the resulting command
//! arrays, and hands the survivors to the downstream sink tagged with the
//! logical database they apply to.
//!
//! # Design
//!
//! - [`parser::run`] owns the loop: decode one command array, classify it
//!   with [`normalize::classify`], act on the result.
//! - `SELECT` updates the current database and is never forwarded;
//!   heartbeat and transaction-boundary commands (`PING`, `REPLCONF`,
//!   `OPINFO`, `MULTI`, `EXEC`) and sentinel pub/sub chatter
//!   (`PUBLISH __sentinel__:hello …`) are dropped; everything else is
//!   forwarded as-is, including commands this crate doesn't recognize.
//!
//! # Invariants
//!
//! - Command matching is case-insensitive.
//! - An unrecognized command is never an error — it is forwarded
//!   unchanged, since this crate has no opinion on what the downstream
//!   target supports.
//!
//! # Errors
//!
//! All fallible operations return [`error::StreamResult`]; see
//! [`error::StreamError`] for the variants. A malformed command array is
//! the only fatal condition this crate raises on its own.

pub mod error;
mod normalize;
pub mod parser;

pub use error::{StreamError, StreamResult};
pub use parser::run;
