#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `spool` durably buffers a live byte stream to disk as a directory of
//! monotonically indexed segment files, so a replication session's network
//! read and its downstream decoder can run on independent schedules: the
//! writer never blocks on the reader, and the reader never blocks on the
//! network.
//!
//! # Design
//!
//! - [`SpoolWriter`] exclusively owns the current segment's file
//!   descriptor. It resumes a partially filled segment across restarts
//!   rather than always starting fresh, so a crash never orphans a short
//!   segment.
//! - [`SpoolReader`] treats EOF on the current segment as ambiguous — it
//!   cannot tell "caught up" from "rotation in progress" — and polls until
//!   either the segment grows or the next one appears.
//! - [`cancel::CancelToken`] is the single flag both sides observe so a
//!   cancelled session exits within one poll interval without leaving an
//!   open file descriptor behind.
//!
//! # Invariants
//!
//! - Segment filenames are `<index>.aof`, sorted numerically; the set of
//!   indices is a contiguous prefix with no gaps at the write head.
//! - Every segment but the current one has size at least `segment_max`.
//! - A single [`SpoolWriter::write`] call never splits across segments.
//!
//! # Errors
//!
//! All fallible operations return [`error::SpoolResult`]; see
//! [`error::SpoolError`] for the variants.

pub mod cancel;
pub mod error;
pub mod reader;
mod segment;
pub mod writer;

pub use cancel::CancelToken;
pub use error::{SpoolError, SpoolResult};
pub use reader::{SpoolReader, CANCELLED_IO_KIND};
pub use segment::lowest_index;
pub use writer::SpoolWriter;
