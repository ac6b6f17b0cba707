//! Greedy delta encoding against an indexed source.

use crate::error::{DeltaError, DeltaResult};
use crate::index::DeltaIndex;
use crate::instruction::{Instruction, MAX_COPY_LEN, MAX_INSERT_LEN};
use crate::varint::write_varint;
use crate::MIN_COPY_LEN;

/// Encodes `target` as a delta against `source`.
///
/// Builds a [`DeltaIndex`] over the source and serializes the instruction
/// stream in git's delta format. An empty target yields a delta holding
/// only the two size varints.
///
/// # Errors
///
/// Returns [`DeltaError::SourceTooLarge`] when the source exceeds the index
/// limit and [`DeltaError::InvalidInput`] when either buffer does not fit
/// the 32-bit size domain.
pub fn encode(source: &[u8], target: &[u8]) -> DeltaResult<Vec<u8>> {
    let index = DeltaIndex::new(source)?;
    encode_with_index(&index, target)
}

/// Encodes `target` against an already-built index.
///
/// The pack writer prepares one index per base and reuses it across the
/// candidate window, so serialization is split from index construction.
pub fn encode_with_index(index: &DeltaIndex<'_>, target: &[u8]) -> DeltaResult<Vec<u8>> {
    let source = index.source();
    check_size("source", source.len())?;
    check_size("target", target.len())?;

    // The delta is usually much smaller than the target; let it grow.
    let mut delta = Vec::with_capacity(target.len() / 4 + 16);
    write_varint(&mut delta, source.len() as u64);
    write_varint(&mut delta, target.len() as u64);

    walk(index, target, |instruction| instruction.encode_into(&mut delta));

    Ok(delta)
}

/// Copy/insert statistics for a source/target pair.
///
/// Produced by [`analyze`], which runs the encoder walk without
/// serializing anything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaStats {
    /// Length of the source buffer in bytes.
    pub source_size: u64,
    /// Length of the target buffer in bytes.
    pub target_size: u64,
    /// Target bytes covered by COPY instructions.
    pub copy_bytes: u64,
    /// Target bytes carried as INSERT literals.
    pub insert_bytes: u64,
    /// Number of COPY instructions.
    pub copy_instructions: usize,
    /// Number of INSERT instructions.
    pub insert_instructions: usize,
}

impl DeltaStats {
    /// Returns the total instruction count.
    #[must_use]
    pub const fn total_instructions(&self) -> usize {
        self.copy_instructions + self.insert_instructions
    }

    /// Returns the fraction of the target reconstructed from the source.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        self.copy_bytes as f64 / self.target_size.max(1) as f64
    }
}

/// Computes [`DeltaStats`] for the pair without producing a delta.
///
/// # Errors
///
/// Fails for the same inputs [`encode`] rejects.
pub fn analyze(source: &[u8], target: &[u8]) -> DeltaResult<DeltaStats> {
    let index = DeltaIndex::new(source)?;
    check_size("source", source.len())?;
    check_size("target", target.len())?;

    let mut stats = DeltaStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        ..DeltaStats::default()
    };

    walk(&index, target, |instruction| match instruction {
        Instruction::Copy { len, .. } => {
            stats.copy_bytes += u64::from(len);
            stats.copy_instructions += 1;
        }
        Instruction::Insert(bytes) => {
            stats.insert_bytes += bytes.len() as u64;
            stats.insert_instructions += 1;
        }
    });

    Ok(stats)
}

fn check_size(what: &'static str, len: usize) -> DeltaResult<()> {
    if len as u64 > u64::from(u32::MAX) {
        return Err(DeltaError::InvalidInput {
            what,
            value: len as u64,
        });
    }
    Ok(())
}

/// Walks the target greedily, handing each instruction to `sink`.
///
/// Matches of at least [`MIN_COPY_LEN`] bytes become COPY instructions,
/// split at [`MAX_COPY_LEN`]; everything else accumulates into INSERT
/// literals that close at [`MAX_INSERT_LEN`] bytes or at the next match.
fn walk<'a, F>(index: &DeltaIndex<'_>, target: &'a [u8], mut sink: F)
where
    F: FnMut(Instruction<'a>),
{
    let mut pos = 0;
    while pos < target.len() {
        match index.find_match(target, pos) {
            Some(m) if m.len >= MIN_COPY_LEN => {
                let mut offset = m.src_offset;
                let mut remaining = m.len;
                while remaining > 0 {
                    let chunk = remaining.min(MAX_COPY_LEN);
                    sink(Instruction::Copy {
                        offset: offset as u32,
                        len: chunk as u32,
                    });
                    offset += chunk;
                    remaining -= chunk;
                }
                pos += m.len;
            }
            _ => {
                let start = pos;
                let mut end = pos + 1;
                while end < target.len() && end - start < MAX_INSERT_LEN {
                    match index.find_match(target, end) {
                        Some(m) if m.len >= MIN_COPY_LEN => break,
                        _ => end += 1,
                    }
                }
                sink(Instruction::Insert(&target[start..end]));
                pos = end;
            }
        }
    }
}
