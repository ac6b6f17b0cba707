//! Window index over a delta source buffer.
//!
//! The index hashes every 16-byte window of the source and chains the
//! offsets that share a hash. Chains live in two contiguous arrays linked
//! through indices, so building the index costs one `Vec` push per window
//! and lookups walk cache-friendly `u32` slots instead of heap nodes.

use std::collections::hash_map::Entry;

use fingerprint::{static_hash_at, RollingHash, WINDOW};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{DeltaError, DeltaResult};
use crate::MAX_INDEX_BYTES;

/// Sentinel marking the end of a bucket chain.
const END_OF_CHAIN: u32 = u32::MAX;

/// A source region matching the target window at some position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourceMatch {
    /// Offset of the match within the source buffer.
    pub src_offset: usize,
    /// Number of matching bytes, always at least [`WINDOW`].
    pub len: usize,
}

/// Immutable lookup structure over a borrowed source buffer.
///
/// Chains preserve insertion order, so equally long matches resolve to the
/// smallest source offset.
#[derive(Clone, Debug)]
pub struct DeltaIndex<'a> {
    source: &'a [u8],
    buckets: FxHashMap<u32, u32>,
    offsets: Vec<u32>,
    next: Vec<u32>,
}

impl<'a> DeltaIndex<'a> {
    /// Indexes `source` under the default [`MAX_INDEX_BYTES`] limit.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::SourceTooLarge`] when the buffer exceeds the
    /// limit. Sources shorter than one window build an empty index.
    pub fn new(source: &'a [u8]) -> DeltaResult<Self> {
        Self::with_limit(source, MAX_INDEX_BYTES)
    }

    /// Indexes `source`, refusing buffers larger than `limit` bytes.
    pub fn with_limit(source: &'a [u8], limit: usize) -> DeltaResult<Self> {
        if source.len() > limit {
            return Err(DeltaError::SourceTooLarge {
                len: source.len(),
                limit,
            });
        }
        // Offsets travel as u32 both here and in COPY instructions.
        if source.len() as u64 > u64::from(u32::MAX) {
            return Err(DeltaError::InvalidInput {
                what: "source",
                value: source.len() as u64,
            });
        }

        let mut index = Self {
            source,
            buckets: FxHashMap::default(),
            offsets: Vec::new(),
            next: Vec::new(),
        };

        if source.len() < WINDOW {
            return Ok(index);
        }

        let windows = source.len() - WINDOW + 1;
        index.offsets.reserve_exact(windows);
        index.next.reserve_exact(windows);

        // Tail slots are only needed while appending; chains keep insertion
        // order because new entries link at the tail, never the head.
        let mut tails: FxHashMap<u32, u32> = FxHashMap::default();
        let mut rolling = RollingHash::new();

        for (end, &byte) in source.iter().enumerate() {
            let hash = rolling.push(byte);
            if end + 1 < WINDOW {
                continue;
            }
            let slot = index.offsets.len() as u32;
            index.offsets.push((end + 1 - WINDOW) as u32);
            index.next.push(END_OF_CHAIN);
            match tails.entry(hash) {
                Entry::Occupied(mut entry) => {
                    let tail = *entry.get();
                    index.next[tail as usize] = slot;
                    entry.insert(slot);
                }
                Entry::Vacant(entry) => {
                    index.buckets.insert(hash, slot);
                    entry.insert(slot);
                }
            }
        }

        debug!(
            source_len = source.len(),
            windows,
            buckets = index.buckets.len(),
            "delta index built"
        );

        Ok(index)
    }

    /// Returns the source buffer this index was built over.
    #[must_use]
    pub const fn source(&self) -> &'a [u8] {
        self.source
    }

    /// Returns the number of indexed windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` when no window was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Finds the longest source match for the window of `target` at `pos`.
    ///
    /// Returns `None` when no window fits at `pos`, when no chain exists
    /// for the window's hash, or when the best extension stays below
    /// [`WINDOW`] bytes. Ties go to the earliest chain entry.
    #[must_use]
    pub fn find_match(&self, target: &[u8], pos: usize) -> Option<SourceMatch> {
        let hash = static_hash_at(target, pos).ok()?;
        let mut best: Option<SourceMatch> = None;

        let mut slot = *self.buckets.get(&hash)?;
        loop {
            let src_offset = self.offsets[slot as usize] as usize;
            let len = common_prefix_len(&self.source[src_offset..], &target[pos..]);
            if len >= WINDOW && best.map_or(true, |b| len > b.len) {
                best = Some(SourceMatch { src_offset, len });
                // Nothing later in the chain can beat a match covering the
                // whole remaining target, and ties keep the first entry.
                if len == target.len() - pos {
                    break;
                }
            }
            slot = self.next[slot as usize];
            if slot == END_OF_CHAIN {
                break;
            }
        }

        best
    }

    /// Returns every source match of at least [`WINDOW`] bytes at `pos`,
    /// in chain order.
    #[must_use]
    pub fn find_all_matches(&self, target: &[u8], pos: usize) -> Vec<SourceMatch> {
        let mut matches = Vec::new();
        let Ok(hash) = static_hash_at(target, pos) else {
            return matches;
        };
        let Some(&head) = self.buckets.get(&hash) else {
            return matches;
        };

        let mut slot = head;
        loop {
            let src_offset = self.offsets[slot as usize] as usize;
            let len = common_prefix_len(&self.source[src_offset..], &target[pos..]);
            if len >= WINDOW {
                matches.push(SourceMatch { src_offset, len });
            }
            slot = self.next[slot as usize];
            if slot == END_OF_CHAIN {
                break;
            }
        }

        matches
    }
}

/// Length of the common prefix of two slices, compared in 8-byte chunks.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    let max_len = a.len().min(b.len());
    let mut len = 0;

    while len + 8 <= max_len {
        let a_chunk = u64::from_le_bytes(a[len..len + 8].try_into().unwrap());
        let b_chunk = u64::from_le_bytes(b[len..len + 8].try_into().unwrap());
        if a_chunk != b_chunk {
            break;
        }
        len += 8;
    }

    while len < max_len && a[len] == b[len] {
        len += 1;
    }

    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_window_source_builds_empty_index() {
        let index = DeltaIndex::new(b"tiny").expect("index");
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.find_match(b"tiny tiny tiny tiny", 0).is_none());
    }

    #[test]
    fn oversized_source_is_rejected() {
        let source = vec![0u8; 64];
        let error = DeltaIndex::with_limit(&source, 63).unwrap_err();
        assert_eq!(
            error,
            DeltaError::SourceTooLarge {
                len: 64,
                limit: 63
            }
        );
    }

    #[test]
    fn every_window_is_indexed() {
        let source = b"abcdefghijklmnopqrstuvwxyz";
        let index = DeltaIndex::new(source).expect("index");
        assert_eq!(index.len(), source.len() - WINDOW + 1);
    }

    #[test]
    fn find_match_extends_past_the_window() {
        let source = b"....the quick brown fox jumps over the lazy dog....";
        let target = b"the quick brown fox jumps over!!";
        let index = DeltaIndex::new(source).expect("index");

        let m = index.find_match(target, 0).expect("match");
        assert_eq!(m.src_offset, 4);
        assert_eq!(m.len, 30);
        assert_eq!(&source[m.src_offset..m.src_offset + m.len], &target[..m.len]);
    }

    #[test]
    fn find_match_requires_a_full_window_at_pos() {
        let source = b"0123456789abcdef0123456789abcdef";
        let index = DeltaIndex::new(source).expect("index");
        let target = b"0123456789abcdef";
        assert!(index.find_match(target, 1).is_none());
        assert!(index.find_match(target, target.len()).is_none());
    }

    #[test]
    fn ties_resolve_to_the_smallest_offset() {
        // Two identical 16-byte regions; the earlier one must win.
        let mut source = Vec::new();
        source.extend_from_slice(b"AAAABBBBCCCCDDDD");
        source.extend_from_slice(b"zzzzzzzzzzzzzzzz");
        source.extend_from_slice(b"AAAABBBBCCCCDDDD");
        let index = DeltaIndex::new(&source).expect("index");

        let m = index.find_match(b"AAAABBBBCCCCDDDD", 0).expect("match");
        assert_eq!(m.src_offset, 0);
        assert_eq!(m.len, WINDOW);
    }

    #[test]
    fn longer_match_beats_earlier_shorter_one() {
        let mut source = Vec::new();
        source.extend_from_slice(b"AAAABBBBCCCCDDDDxxxx");
        source.extend_from_slice(b"AAAABBBBCCCCDDDDEEEE");
        let index = DeltaIndex::new(&source).expect("index");

        let m = index.find_match(b"AAAABBBBCCCCDDDDEEEE", 0).expect("match");
        assert_eq!(m.src_offset, 20);
        assert_eq!(m.len, 20);
    }

    #[test]
    fn find_all_matches_reports_every_occurrence() {
        let mut source = Vec::new();
        for filler in [b'x', b'y', b'z'] {
            source.extend_from_slice(b"AAAABBBBCCCCDDDD");
            source.extend_from_slice(&[filler; 4]);
        }
        let index = DeltaIndex::new(&source).expect("index");

        let matches = index.find_all_matches(b"AAAABBBBCCCCDDDD", 0);
        let offsets: Vec<usize> = matches.iter().map(|m| m.src_offset).collect();
        assert_eq!(offsets, [0, 20, 40]);
        assert!(matches.iter().all(|m| m.len >= WINDOW));
    }

    #[test]
    fn matches_are_byte_accurate() {
        let source: Vec<u8> = (0u32..4096).map(|i| (i % 251) as u8).collect();
        let mut target = source.clone();
        target[100] ^= 0xff;
        let index = DeltaIndex::new(&source).expect("index");

        for pos in [0usize, 101, 500, 2048] {
            if let Some(m) = index.find_match(&target, pos) {
                assert_eq!(
                    &source[m.src_offset..m.src_offset + m.len],
                    &target[pos..pos + m.len]
                );
            }
        }
    }

    #[test]
    fn common_prefix_len_handles_unaligned_tails() {
        assert_eq!(common_prefix_len(b"abcdefghi", b"abcdefghx"), 8);
        assert_eq!(common_prefix_len(b"abc", b"abd"), 2);
        assert_eq!(common_prefix_len(b"", b"abc"), 0);
        assert_eq!(common_prefix_len(b"same", b"same"), 4);
    }
}
