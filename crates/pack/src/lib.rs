#![deny(unsafe_code)]

//! Streaming pack-v2 writing with delta base selection.
//!
//! This crate turns a list of content-addressed objects into a pack byte
//! stream: full deflated entries interleaved with OFS_DELTA entries, a
//! 12-byte header up front, and a SHA-1 trailer over everything emitted.
//!
//! - [`PackObject`] carries one object's id, kind, borrowed payload, and
//!   advisory path into the writer
//! - [`PackWriter`] orders the objects, selects delta bases from a sliding
//!   candidate window, and emits the stream in a single pass
//! - [`verify_pack`] walks a finished stream back, resolving delta chains
//!   and recomputing the trailer
//!
//! # Design
//!
//! Delta generation reuses the index and encoder from the `delta` crate.
//! Compression and hashing are narrow collaborator traits ([`Deflate`],
//! [`PackDigest`]) with flate2- and sha1-backed defaults, so tests can
//! observe or fail those seams deliberately. Base selection is pure
//! functions ([`is_admissible`], [`compute_similarity_score`],
//! [`accept_delta`]): an admissibility filter, a 0-100 similarity score,
//! and an accept policy that keeps a delta only when it beats both half
//! the target and its own base.
//!
//! # See also
//!
//! - The `delta` crate for the instruction-level wire format.

mod candidates;
mod deflate;
mod digest;
mod error;
mod header;
mod object;
mod verify;
mod writer;

pub use candidates::{
    accept_delta, compute_similarity_score, emission_order, find_best, is_admissible,
    CANDIDATE_WINDOW, MAX_DELTA_CHAIN_DEPTH, MAX_SIZE_RATIO, MIN_SIZE_FOR_DELTA,
};
pub use deflate::{decompress_to_vec, CompressionLevel, Deflate, Zlib};
pub use digest::{PackDigest, Sha1Digest};
pub use error::{PackError, PackResult};
pub use header::{
    read_entry_header, read_ofs_backref, write_entry_header, write_ofs_backref, OFS_DELTA,
    REF_DELTA,
};
pub use object::{ObjectId, ObjectKind, ObjectSource, PackObject};
pub use verify::{verify_pack, VerifiedEntry, VerifiedPack};
pub use writer::{PackOptions, PackSummary, PackWriter};

/// Magic bytes every pack stream starts with.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// The only pack version this crate produces or reads.
pub const PACK_VERSION: u32 = 2;

/// Length of the fixed pack header in bytes.
pub const PACK_HEADER_SIZE: usize = 12;
