#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rdb` decodes a binary Redis snapshot file into the command sequence
//! that, replayed against an empty database, reconstructs it. The snapshot
//! format is a flat stream of opcodes: most bytes select a reconstruction
//! path for a key/value pair, a handful of reserved opcodes (244-255)
//! carry structural metadata — which database follows, an expiry to
//! attach to the next key, auxiliary fields, module data, and the
//! terminating EOF marker.
//!
//! # Design
//!
//! - [`length`] and [`lzf`] hold the bit-level primitives every decoder is
//!   built from: the variable-width length encoding, string/int/LZF
//!   string decoding, the two float formats, and little-endian integer
//!   reads for the expire opcodes.
//! - [`ziplist`] and [`listpack`] decode the two legacy/modern packed
//!   container formats into flat entry sequences; [`value`] interleaves
//!   those entries into the command shape each value kind needs.
//! - [`decoder`] owns the top-level opcode loop (`now_db_id`, the pending
//!   expire carried from an opcode to the key that follows it, and
//!   progress reporting); [`snapshot`] wraps it with file-header handling.
//!
//! # Invariants
//!
//! - Every value decoder's first emitted command is `DEL <key>`, so replay
//!   is idempotent against pre-existing state regardless of value kind.
//! - A decode failure aborts the walk outright — a half-imported snapshot
//!   is never handed downstream.
//!
//! # Errors
//!
//! All fallible operations return [`error::RdbResult`]; see
//! [`error::RdbError`] for the variants.

mod command;
pub mod decoder;
pub mod error;
mod length;
mod listpack;
mod lzf;
mod opcode;
pub mod snapshot;
mod value;
mod ziplist;

pub use decoder::{decode_body, NoProgress, ProgressHook};
pub use error::{RdbError, RdbResult};
pub use snapshot::decode_snapshot_file;
pub use wire::Entry;
