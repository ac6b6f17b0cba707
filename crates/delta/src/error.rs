//! Common error types for delta encoding and application.

use thiserror::Error;

/// Result type for delta operations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors surfaced by the delta index, encoder, and applier.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum DeltaError {
    /// A size at the API boundary does not fit the 32-bit wire domain.
    #[error("{what} of {value} bytes exceeds the 32-bit size domain")]
    InvalidInput {
        /// Which input was out of range.
        what: &'static str,
        /// The offending value.
        value: u64,
    },
    /// The source buffer is too large to index.
    #[error("source of {len} bytes exceeds the {limit}-byte index limit")]
    SourceTooLarge {
        /// Length of the rejected source buffer.
        len: usize,
        /// Index limit in force.
        limit: usize,
    },
    /// The delta header disagrees with the supplied source buffer.
    #[error("delta header declares a {declared}-byte source, buffer holds {actual}")]
    SourceMismatch {
        /// Source size recorded in the delta header.
        declared: usize,
        /// Actual length of the source buffer.
        actual: usize,
    },
    /// The delta ended before producing the declared target.
    #[error("truncated delta: {context}")]
    TruncatedDelta {
        /// Which part of the stream ran dry.
        context: &'static str,
    },
    /// The delta produced more bytes than its header declared.
    #[error("delta produced {produced} bytes, header declared {declared}")]
    ExtraData {
        /// Bytes actually produced.
        produced: usize,
        /// Target size recorded in the delta header.
        declared: usize,
    },
    /// A zero code byte, which the format reserves.
    #[error("reserved zero opcode at delta offset {at}")]
    InvalidOpcode {
        /// Offset of the zero byte within the delta.
        at: usize,
    },
    /// A COPY instruction references bytes outside the source.
    #[error("copy of {len} bytes at offset {offset} escapes a {source_size}-byte source")]
    CopyOutOfBounds {
        /// Source offset the copy starts at.
        offset: usize,
        /// Length of the copy.
        len: usize,
        /// Length of the source buffer.
        source_size: usize,
    },
}
