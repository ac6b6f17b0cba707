#![deny(unsafe_code)]

//! # Overview
//!
//! Rabin-style rolling fingerprint over a fixed 16-byte window. The
//! fingerprint is the weak hash that drives delta matching: the delta index
//! hashes every window of a source buffer, and the encoder slides the same
//! window over a target buffer to look up candidate copy regions. Both sides
//! use the single [`static_hash`] definition exported here, so a hash
//! computed incrementally via [`RollingHash::push`] always agrees with the
//! hash of the same 16 bytes computed in one shot.
//!
//! # Design
//!
//! The hash is a 23-bit polynomial fingerprint. Each pushed byte is folded
//! through a GF(2)-linear step function; the bits shifted out of the 23-bit
//! state are reduced through precomputed tables derived from
//! [`POLYNOMIAL`]. Because the step is linear, the total contribution of the
//! byte leaving the window is itself a table lookup, which is what makes the
//! per-byte slide O(1).
//!
//! # Invariants
//!
//! - After `k >= WINDOW` pushes of a buffer `B`, the rolling hash equals
//!   `static_hash(&B[k - WINDOW..k])`.
//! - All hash values are strictly below `1 << SHIFT`.
//! - The reduction tables are deterministic constants; they are computed on
//!   first use and shared read-only afterwards.

mod rolling;
mod tables;

pub use rolling::{static_hash, static_hash_at, FingerprintError, RollingHash};

/// Width of the sliding window in bytes.
pub const WINDOW: usize = 16;

/// Number of significant hash bits.
pub const SHIFT: u32 = 23;

/// Mask keeping a hash value inside its 23-bit domain.
pub const MASK: u32 = (1 << SHIFT) - 1;

/// Low bits of the degree-23 reduction polynomial.
pub const POLYNOMIAL: u32 = 0x1d;
