//! Rolling fingerprint state and the fixed-window static hash.

use std::fmt;

use crate::tables::{EVICT, SHIFT_OUT};
use crate::{MASK, WINDOW};

/// Errors produced by fixed-window hashing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FingerprintError {
    /// The requested window does not fit inside the buffer.
    InvalidRange {
        /// Offset the window was supposed to start at.
        offset: usize,
        /// Length of the buffer that was hashed.
        len: usize,
    },
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintError::InvalidRange { offset, len } => {
                write!(
                    f,
                    "window of {WINDOW} bytes at offset {offset} exceeds buffer of {len} bytes"
                )
            }
        }
    }
}

impl std::error::Error for FingerprintError {}

/// Folds one byte into a 23-bit hash state.
#[inline]
fn step(hash: u32, byte: u8) -> u32 {
    (((hash << 8) & MASK) ^ u32::from(byte)) ^ SHIFT_OUT[(hash >> 15) as usize]
}

/// Hashes exactly [`WINDOW`] bytes.
///
/// This is the reference definition the rolling variant must agree with:
/// the bytes are folded left to right through the same step function that
/// [`RollingHash::push`] uses.
#[must_use]
pub fn static_hash(window: &[u8; WINDOW]) -> u32 {
    window.iter().fold(0, |hash, &byte| step(hash, byte))
}

/// Hashes the [`WINDOW`] bytes of `buffer` starting at `offset`.
///
/// # Errors
///
/// Returns [`FingerprintError::InvalidRange`] when `offset + WINDOW` exceeds
/// the buffer length.
pub fn static_hash_at(buffer: &[u8], offset: usize) -> Result<u32, FingerprintError> {
    let end = offset.checked_add(WINDOW).filter(|&end| end <= buffer.len());
    match end {
        Some(end) => {
            let window: &[u8; WINDOW] = buffer[offset..end]
                .try_into()
                .expect("slice length equals WINDOW");
            Ok(static_hash(window))
        }
        None => Err(FingerprintError::InvalidRange {
            offset,
            len: buffer.len(),
        }),
    }
}

/// Incremental fingerprint over a sliding 16-byte window.
///
/// The window starts empty and warms up byte by byte; once 16 bytes have
/// been pushed, every further push evicts the oldest byte at the circular
/// cursor and the hash keeps tracking the most recent 16 bytes in O(1).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingHash {
    window: [u8; WINDOW],
    cursor: usize,
    len: usize,
    hash: u32,
}

impl RollingHash {
    /// Creates an empty fingerprint.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window: [0; WINDOW],
            cursor: 0,
            len: 0,
            hash: 0,
        }
    }

    /// Advances the window by one byte and returns the updated hash.
    #[inline]
    pub fn push(&mut self, byte: u8) -> u32 {
        if self.len < WINDOW {
            self.window[self.cursor] = byte;
            self.cursor = (self.cursor + 1) % WINDOW;
            self.len += 1;
            self.hash = step(self.hash, byte);
        } else {
            let evicted = self.window[self.cursor];
            self.window[self.cursor] = byte;
            self.cursor = (self.cursor + 1) % WINDOW;
            self.hash = step(self.hash, byte) ^ EVICT[evicted as usize];
        }
        self.hash
    }

    /// Returns the current hash value.
    #[must_use]
    pub const fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns `true` once a full window of bytes has been pushed.
    #[must_use]
    pub const fn filled(&self) -> bool {
        self.len == WINDOW
    }

    /// Returns the bytes currently in the window, oldest first.
    #[must_use]
    pub fn window_copy(&self) -> Vec<u8> {
        let mut copy = Vec::with_capacity(self.len);
        if self.len < WINDOW {
            copy.extend_from_slice(&self.window[..self.len]);
        } else {
            copy.extend_from_slice(&self.window[self.cursor..]);
            copy.extend_from_slice(&self.window[..self.cursor]);
        }
        copy
    }

    /// Clears the window and hash back to the initial state.
    pub fn reset(&mut self) {
        self.window = [0; WINDOW];
        self.cursor = 0;
        self.len = 0;
        self.hash = 0;
    }
}
