//! Delta application: reconstructing a target from source plus delta.

use crate::error::{DeltaError, DeltaResult};
use crate::instruction::MAX_COPY_LEN;
use crate::varint::read_varint;

/// Applies `delta` to `source`, reconstructing the target buffer.
///
/// The inverse of [`encode`](crate::encode): reads the two size varints,
/// validates the source length, then executes COPY and INSERT instructions
/// with full bounds checking. The output must come out at exactly the
/// declared target size.
///
/// # Errors
///
/// - [`DeltaError::SourceMismatch`] when the header's source size differs
///   from `source.len()`
/// - [`DeltaError::TruncatedDelta`] when the stream ends inside an
///   instruction or under-produces the target
/// - [`DeltaError::ExtraData`] when more than the declared target is
///   produced
/// - [`DeltaError::InvalidOpcode`] on a zero code byte
/// - [`DeltaError::CopyOutOfBounds`] when a COPY escapes the source
pub fn apply(source: &[u8], delta: &[u8]) -> DeltaResult<Vec<u8>> {
    let mut pos = 0usize;

    let declared_source = read_varint(delta, &mut pos)? as usize;
    if declared_source != source.len() {
        return Err(DeltaError::SourceMismatch {
            declared: declared_source,
            actual: source.len(),
        });
    }

    let declared_target = read_varint(delta, &mut pos)? as usize;
    let mut output = Vec::with_capacity(declared_target);

    while pos < delta.len() {
        let code = delta[pos];
        pos += 1;

        if code & 0x80 != 0 {
            let mut offset = 0usize;
            let mut len = 0usize;

            for shift in 0..4u32 {
                if code & (1 << shift) != 0 {
                    let byte = take_byte(delta, &mut pos, "copy offset operand")?;
                    offset |= (byte as usize) << (shift * 8);
                }
            }
            for shift in 0..3u32 {
                if code & (1 << (4 + shift)) != 0 {
                    let byte = take_byte(delta, &mut pos, "copy length operand")?;
                    len |= (byte as usize) << (shift * 8);
                }
            }
            // Absent length bits mean the full 64 KiB span.
            if len == 0 {
                len = MAX_COPY_LEN;
            }

            let end = offset
                .checked_add(len)
                .filter(|&end| end <= source.len())
                .ok_or(DeltaError::CopyOutOfBounds {
                    offset,
                    len,
                    source_size: source.len(),
                })?;
            output.extend_from_slice(&source[offset..end]);
        } else if code != 0 {
            let len = code as usize;
            let end = pos + len;
            if end > delta.len() {
                return Err(DeltaError::TruncatedDelta {
                    context: "insert literal",
                });
            }
            output.extend_from_slice(&delta[pos..end]);
            pos = end;
        } else {
            return Err(DeltaError::InvalidOpcode { at: pos - 1 });
        }
    }

    if output.len() < declared_target {
        return Err(DeltaError::TruncatedDelta {
            context: "instruction stream under-produces the declared target",
        });
    }
    if output.len() > declared_target {
        return Err(DeltaError::ExtraData {
            produced: output.len(),
            declared: declared_target,
        });
    }

    Ok(output)
}

fn take_byte(delta: &[u8], pos: &mut usize, context: &'static str) -> DeltaResult<u8> {
    let byte = *delta
        .get(*pos)
        .ok_or(DeltaError::TruncatedDelta { context })?;
    *pos += 1;
    Ok(byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::write_varint;

    fn delta_with(source_size: usize, target_size: usize, body: &[u8]) -> Vec<u8> {
        let mut delta = Vec::new();
        write_varint(&mut delta, source_size as u64);
        write_varint(&mut delta, target_size as u64);
        delta.extend_from_slice(body);
        delta
    }

    #[test]
    fn applies_mixed_copy_and_insert() {
        let source = b"ABCDEFGHIJ";
        // Copy "ABC", insert "xyz", copy "HIJ".
        let body = [
            0x80 | 0x10,
            3,
            3,
            b'x',
            b'y',
            b'z',
            0x80 | 0x01 | 0x10,
            7,
            3,
        ];
        let delta = delta_with(source.len(), 9, &body);
        assert_eq!(apply(source, &delta).expect("apply"), b"ABCxyzHIJ");
    }

    #[test]
    fn zero_length_copy_means_full_span() {
        let source = vec![7u8; MAX_COPY_LEN];
        // Code byte with no offset and no length operands.
        let delta = delta_with(source.len(), MAX_COPY_LEN, &[0x80]);
        assert_eq!(apply(&source, &delta).expect("apply"), source);
    }

    #[test]
    fn source_mismatch_is_rejected() {
        let delta = delta_with(100, 0, &[]);
        assert_eq!(
            apply(b"five!", &delta),
            Err(DeltaError::SourceMismatch {
                declared: 100,
                actual: 5
            })
        );
    }

    #[test]
    fn zero_opcode_is_rejected() {
        let delta = delta_with(3, 1, &[0x00]);
        assert_eq!(
            apply(b"abc", &delta),
            Err(DeltaError::InvalidOpcode { at: 2 })
        );
    }

    #[test]
    fn copy_escaping_source_is_rejected() {
        // Copy 8 bytes at offset 4 from a 5-byte source.
        let delta = delta_with(5, 8, &[0x80 | 0x01 | 0x10, 4, 8]);
        assert_eq!(
            apply(b"short", &delta),
            Err(DeltaError::CopyOutOfBounds {
                offset: 4,
                len: 8,
                source_size: 5
            })
        );
    }

    #[test]
    fn truncated_insert_literal_is_rejected() {
        let delta = delta_with(0, 5, &[5, b'a', b'b']);
        assert_eq!(
            apply(b"", &delta),
            Err(DeltaError::TruncatedDelta {
                context: "insert literal"
            })
        );
    }

    #[test]
    fn truncated_copy_operand_is_rejected() {
        let delta = delta_with(32, 4, &[0x80 | 0x01]);
        assert!(matches!(
            apply(&[0u8; 32], &delta),
            Err(DeltaError::TruncatedDelta { .. })
        ));
    }

    #[test]
    fn under_production_is_truncated() {
        let delta = delta_with(4, 10, &[0x80 | 0x10, 4]);
        assert!(matches!(
            apply(b"abcd", &delta),
            Err(DeltaError::TruncatedDelta { .. })
        ));
    }

    #[test]
    fn over_production_is_extra_data() {
        let delta = delta_with(4, 2, &[0x80 | 0x10, 4]);
        assert_eq!(
            apply(b"abcd", &delta),
            Err(DeltaError::ExtraData {
                produced: 4,
                declared: 2
            })
        );
    }

    #[test]
    fn empty_delta_body_reconstructs_empty_target() {
        let delta = delta_with(9, 0, &[]);
        assert_eq!(apply(b"unusable!", &delta).expect("apply"), Vec::<u8>::new());
    }
}
