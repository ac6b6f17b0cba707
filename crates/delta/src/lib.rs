#![deny(unsafe_code)]

//! Binary delta compression against an indexed source buffer.
//!
//! This crate provides the three delta primitives of the pack pipeline:
//! - [`DeltaIndex`] hashes every 16-byte window of a source buffer for
//!   near-constant-time longest-match lookup
//! - [`encode`] walks a target buffer greedily, emitting COPY instructions
//!   that reference the source and INSERT instructions carrying literals
//! - [`apply`] executes a delta against the source to reconstruct the target
//!
//! # Design
//!
//! The wire format is git's delta encoding: two LEB128 varints carrying the
//! source and target sizes, followed by a stream of one-byte opcodes with
//! bit-gated operands. The index reuses the rolling fingerprint from the
//! `fingerprint` crate, so a hash computed while sliding over the target is
//! directly comparable with the hashes the source was indexed under.
//!
//! # See also
//!
//! - [`analyze`] runs the encoder walk without serializing and reports
//!   copy/insert statistics for a candidate pair.

mod apply;
mod encode;
mod error;
mod index;
mod instruction;
mod varint;

pub use apply::apply;
pub use encode::{analyze, encode, encode_with_index, DeltaStats};
pub use error::{DeltaError, DeltaResult};
pub use index::{DeltaIndex, SourceMatch};
pub use instruction::{Instruction, MAX_COPY_LEN, MAX_INSERT_LEN};
pub use varint::{read_varint, write_varint};

/// Shortest match worth emitting as a COPY instruction.
///
/// Equal to the fingerprint window: anything shorter cannot be found through
/// the index, and a 16-byte COPY is never larger than the equivalent INSERT.
pub const MIN_COPY_LEN: usize = fingerprint::WINDOW;

/// Largest source buffer the index will accept, in bytes.
pub const MAX_INDEX_BYTES: usize = 100 * 1024 * 1024;
