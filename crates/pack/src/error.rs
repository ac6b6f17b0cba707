//! Common error types for pack writing and verification.

use std::io;

use delta::DeltaError;
use thiserror::Error;

use crate::object::ObjectId;

/// Result type for pack operations.
pub type PackResult<T> = Result<T, PackError>;

/// Errors that can occur while writing or verifying a pack.
#[derive(Debug, Error)]
pub enum PackError {
    /// The object source had no object under the requested id.
    #[error("object {oid} not found in the object source")]
    ObjectNotFound {
        /// Id the source was asked for.
        oid: ObjectId,
    },
    /// The deflate collaborator failed; the underlying error is preserved.
    #[error("compression failed: {0}")]
    CompressionFailed(#[source] io::Error),
    /// Cooperative cancellation observed at an entry boundary.
    #[error("pack write cancelled before entry {index}")]
    Cancelled {
        /// Index of the entry that was about to be emitted.
        index: usize,
    },
    /// Delta encoding or application failed.
    #[error(transparent)]
    Delta(#[from] DeltaError),
    /// The output sink failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A textual object id could not be parsed.
    #[error("invalid object id: {reason}")]
    InvalidObjectId {
        /// What was wrong with the input.
        reason: &'static str,
    },
    /// The pack stream does not start with a valid header.
    #[error("invalid pack header: {reason}")]
    InvalidHeader {
        /// What was wrong with the header.
        reason: &'static str,
    },
    /// The pack declares a version this crate does not understand.
    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),
    /// An entry could not be parsed at the given offset.
    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry {
        /// Byte offset of the entry within the pack.
        offset: u64,
        /// What was wrong with the entry.
        reason: &'static str,
    },
    /// The trailing checksum does not cover the preceding bytes.
    #[error("pack checksum mismatch")]
    TrailerMismatch {
        /// Checksum recorded in the trailer.
        expected: [u8; 20],
        /// Checksum recomputed over the stream.
        actual: [u8; 20],
    },
}
