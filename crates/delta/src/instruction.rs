//! Delta instruction representation and wire encoding.

/// Largest span a single COPY instruction can cover.
pub const MAX_COPY_LEN: usize = 0x10000;

/// Largest literal a single INSERT instruction can carry.
pub const MAX_INSERT_LEN: usize = 127;

/// One step of a delta program.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction<'a> {
    /// Reuse `len` bytes of the source starting at `offset`.
    Copy {
        /// Byte offset into the source buffer.
        offset: u32,
        /// Number of bytes to copy, in `1..=MAX_COPY_LEN`.
        len: u32,
    },
    /// Emit the literal bytes verbatim, `1..=MAX_INSERT_LEN` of them.
    Insert(&'a [u8]),
}

impl Instruction<'_> {
    /// Returns the number of target bytes this instruction produces.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Instruction::Copy { len, .. } => *len as usize,
            Instruction::Insert(bytes) => bytes.len(),
        }
    }

    /// Returns `true` for COPY instructions.
    #[must_use]
    pub const fn is_copy(&self) -> bool {
        matches!(self, Instruction::Copy { .. })
    }

    /// Serializes the instruction in git's opcode format.
    ///
    /// COPY emits a code byte with the high bit set; bits 0..3 gate the
    /// offset bytes and bits 4..6 the length bytes, least significant
    /// first, with zero bytes omitted. A length of exactly `MAX_COPY_LEN`
    /// is encoded with all length bits clear. INSERT emits its literal
    /// length in the low seven bits followed by the literal itself.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Instruction::Copy { offset, len } => {
                debug_assert!(len >= 1 && len as usize <= MAX_COPY_LEN);
                debug_assert!(offset > 0 || len > 0);

                let mut code = 0x80u8;
                let mut operands = [0u8; 6];
                let mut count = 0;

                for shift in 0..4 {
                    let byte = ((offset >> (shift * 8)) & 0xff) as u8;
                    if byte != 0 {
                        code |= 1 << shift;
                        operands[count] = byte;
                        count += 1;
                    }
                }
                if len as usize != MAX_COPY_LEN {
                    for shift in 0..3 {
                        let byte = ((len >> (shift * 8)) & 0xff) as u8;
                        if byte != 0 {
                            code |= 1 << (4 + shift);
                            operands[count] = byte;
                            count += 1;
                        }
                    }
                }

                out.push(code);
                out.extend_from_slice(&operands[..count]);
            }
            Instruction::Insert(bytes) => {
                debug_assert!(!bytes.is_empty() && bytes.len() <= MAX_INSERT_LEN);
                out.push(bytes.len() as u8);
                out.extend_from_slice(bytes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(instruction: Instruction<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        instruction.encode_into(&mut out);
        out
    }

    #[test]
    fn copy_omits_zero_operand_bytes() {
        // offset 0, len 5: only the first length byte is present.
        assert_eq!(encoded(Instruction::Copy { offset: 0, len: 5 }), [0x90, 5]);
    }

    #[test]
    fn copy_gates_offset_bytes_lsb_first() {
        let bytes = encoded(Instruction::Copy {
            offset: 0x0102,
            len: 16,
        });
        // Offset bytes 0x02 (bit 0) and 0x01 (bit 1), then length 0x10.
        assert_eq!(bytes, [0x80 | 0x01 | 0x02 | 0x10, 0x02, 0x01, 0x10]);
    }

    #[test]
    fn copy_of_full_span_clears_length_bits() {
        let bytes = encoded(Instruction::Copy {
            offset: 7,
            len: MAX_COPY_LEN as u32,
        });
        assert_eq!(bytes, [0x80 | 0x01, 7]);
    }

    #[test]
    fn copy_just_below_full_span_keeps_length_bytes() {
        let bytes = encoded(Instruction::Copy {
            offset: 0,
            len: 0xffff,
        });
        assert_eq!(bytes, [0x80 | 0x10 | 0x20, 0xff, 0xff]);
    }

    #[test]
    fn insert_prefixes_literal_with_its_length() {
        assert_eq!(
            encoded(Instruction::Insert(b"abc")),
            [3, b'a', b'b', b'c']
        );
    }

    #[test]
    fn byte_len_reflects_target_contribution() {
        assert_eq!(Instruction::Copy { offset: 9, len: 42 }.byte_len(), 42);
        assert_eq!(Instruction::Insert(b"xyz").byte_len(), 3);
        assert!(Instruction::Copy { offset: 0, len: 1 }.is_copy());
        assert!(!Instruction::Insert(b"x").is_copy());
    }
}
