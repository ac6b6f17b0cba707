//! Zlib compression collaborators for pack bodies.
//!
//! The writer only ever needs "compress this buffer"; the [`Deflate`] trait
//! keeps that seam narrow so tests can substitute counting or failing
//! compressors without touching the emission loop.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Compression levels recognised by the zlib encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionLevel {
    /// Prefer speed over density.
    Fast,
    /// The zlib default trade-off.
    #[default]
    Default,
    /// Prefer density over speed.
    Best,
}

impl CompressionLevel {
    fn to_flate2(self) -> Compression {
        match self {
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
        }
    }
}

/// Compresses a byte buffer into a zlib stream.
pub trait Deflate {
    /// Returns the zlib-wrapped deflate stream for `input`.
    ///
    /// # Errors
    ///
    /// Any error is propagated unchanged to the pack writer, which aborts
    /// the pack.
    fn deflate(&self, input: &[u8]) -> io::Result<Vec<u8>>;
}

/// The stock flate2-backed compressor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zlib {
    level: CompressionLevel,
}

impl Zlib {
    /// Creates a compressor with the given level.
    #[must_use]
    pub const fn new(level: CompressionLevel) -> Self {
        Self { level }
    }
}

impl Deflate for Zlib {
    fn deflate(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(input.len() / 2 + 16),
            self.level.to_flate2(),
        );
        encoder.write_all(input)?;
        encoder.finish()
    }
}

/// Decompresses a complete zlib stream.
///
/// # Errors
///
/// Propagates decoder errors for corrupt or truncated streams.
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}

/// Decompresses the zlib stream at the start of `input`, returning the
/// output and the number of compressed bytes consumed.
///
/// Pack entries do not record their compressed length, so the verification
/// walk relies on the decoder to find each stream's end.
pub(crate) fn inflate_prefix(input: &[u8]) -> io::Result<(Vec<u8>, usize)> {
    let mut decoder = ZlibDecoder::new(input);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    let consumed = usize::try_from(decoder.total_in())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "zlib stream too long"))?;
    Ok((output, consumed))
}
