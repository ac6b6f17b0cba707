//! Read-back verification of a finished pack stream.
//!
//! The walk re-derives every entry boundary from the headers alone, chases
//! OFS_DELTA back-references onto earlier entries, resolves the delta
//! chains, and recomputes the trailer. Integration tests lean on this to
//! prove that what the writer emits is exactly what a pack reader sees.

use delta::apply;
use rustc_hash::FxHashMap;

use crate::deflate::inflate_prefix;
use crate::digest::Sha1Digest;
use crate::error::{PackError, PackResult};
use crate::header::{read_entry_header, read_ofs_backref, OFS_DELTA, REF_DELTA};
use crate::object::ObjectKind;
use crate::{PACK_HEADER_SIZE, PACK_SIGNATURE, PACK_VERSION};

/// Length of the trailing content hash.
const TRAILER_LEN: usize = 20;

/// One fully resolved pack entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedEntry {
    /// Byte offset of the entry's first header byte.
    pub offset: u64,
    /// Resolved object kind (the base's kind for delta entries).
    pub kind: ObjectKind,
    /// Uncompressed body size declared in the entry header.
    pub size: u64,
    /// Start offset of the delta base, for OFS_DELTA entries.
    pub base_offset: Option<u64>,
    /// Delta-chain depth; zero for full entries.
    pub depth: u32,
    /// Fully resolved object payload.
    pub payload: Vec<u8>,
}

/// A pack that passed verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedPack {
    /// Every entry, in emission order.
    pub entries: Vec<VerifiedEntry>,
    /// The trailer recorded in the stream.
    pub trailer: [u8; 20],
}

impl VerifiedPack {
    /// Returns the number of OFS_DELTA entries.
    #[must_use]
    pub fn delta_entries(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.base_offset.is_some())
            .count()
    }
}

/// Walks and validates a complete pack byte stream.
///
/// # Errors
///
/// - [`PackError::InvalidHeader`] for a stream without a valid 12-byte
///   header or enough room for the trailer
/// - [`PackError::UnsupportedVersion`] for versions other than 2
/// - [`PackError::CorruptEntry`] for malformed entries, dangling
///   back-references, or declared sizes that disagree with the bodies
/// - [`PackError::TrailerMismatch`] when the recomputed hash differs
/// - delta errors when a delta body cannot be applied to its base
pub fn verify_pack(pack: &[u8]) -> PackResult<VerifiedPack> {
    if pack.len() < PACK_HEADER_SIZE + TRAILER_LEN {
        return Err(PackError::InvalidHeader {
            reason: "stream shorter than header plus trailer",
        });
    }
    if &pack[..4] != PACK_SIGNATURE {
        return Err(PackError::InvalidHeader {
            reason: "missing PACK signature",
        });
    }
    let version = u32::from_be_bytes(pack[4..8].try_into().expect("4-byte slice"));
    if version != PACK_VERSION {
        return Err(PackError::UnsupportedVersion(version));
    }
    let count = u32::from_be_bytes(pack[8..12].try_into().expect("4-byte slice")) as usize;

    let body_end = pack.len() - TRAILER_LEN;
    let body = &pack[..body_end];
    let mut pos = PACK_HEADER_SIZE;

    let mut entries: Vec<VerifiedEntry> = Vec::with_capacity(count);
    let mut by_offset: FxHashMap<u64, usize> = FxHashMap::default();

    for _ in 0..count {
        let offset = pos as u64;
        if pos >= body_end {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "entry count runs past the trailer",
            });
        }

        let (code, size) = read_entry_header(body, &mut pos)?;
        let entry = match code {
            OFS_DELTA => {
                let distance = read_ofs_backref(body, &mut pos)?;
                let base_offset =
                    offset
                        .checked_sub(distance)
                        .ok_or(PackError::CorruptEntry {
                            offset,
                            reason: "back-reference reaches before the pack start",
                        })?;
                let base_slot =
                    *by_offset
                        .get(&base_offset)
                        .ok_or(PackError::CorruptEntry {
                            offset,
                            reason: "back-reference does not name an entry start",
                        })?;

                let (delta_bytes, consumed) =
                    inflate_prefix(&body[pos..]).map_err(|_| PackError::CorruptEntry {
                        offset,
                        reason: "corrupt zlib stream",
                    })?;
                pos += consumed;
                if delta_bytes.len() as u64 != size {
                    return Err(PackError::CorruptEntry {
                        offset,
                        reason: "declared size disagrees with the inflated delta",
                    });
                }

                let base = &entries[base_slot];
                let payload = apply(&base.payload, &delta_bytes)?;
                VerifiedEntry {
                    offset,
                    kind: base.kind,
                    size,
                    base_offset: Some(base_offset),
                    depth: base.depth + 1,
                    payload,
                }
            }
            REF_DELTA => {
                return Err(PackError::CorruptEntry {
                    offset,
                    reason: "ref_delta entries are not supported",
                });
            }
            code => {
                let kind = ObjectKind::from_type_code(code).ok_or(PackError::CorruptEntry {
                    offset,
                    reason: "unknown entry type code",
                })?;
                let (payload, consumed) =
                    inflate_prefix(&body[pos..]).map_err(|_| PackError::CorruptEntry {
                        offset,
                        reason: "corrupt zlib stream",
                    })?;
                pos += consumed;
                if payload.len() as u64 != size {
                    return Err(PackError::CorruptEntry {
                        offset,
                        reason: "declared size disagrees with the inflated body",
                    });
                }
                VerifiedEntry {
                    offset,
                    kind,
                    size,
                    base_offset: None,
                    depth: 0,
                    payload,
                }
            }
        };

        by_offset.insert(offset, entries.len());
        entries.push(entry);
    }

    if pos != body_end {
        return Err(PackError::CorruptEntry {
            offset: pos as u64,
            reason: "unaccounted bytes between the last entry and the trailer",
        });
    }

    let actual = Sha1Digest::digest(body);
    let expected: [u8; 20] = pack[body_end..].try_into().expect("20-byte trailer");
    if actual != expected {
        return Err(PackError::TrailerMismatch { expected, actual });
    }

    Ok(VerifiedPack { entries, trailer: expected })
}
