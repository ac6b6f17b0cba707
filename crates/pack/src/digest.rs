//! Streaming content digest fed with every emitted pack byte.

use digest::Digest;

/// Streaming 20-byte digest over the pack byte stream.
///
/// The writer updates the digest with every byte it emits and appends
/// [`finalize`](PackDigest::finalize) as the trailer.
pub trait PackDigest {
    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the 160-bit output.
    fn finalize(self) -> [u8; 20];
}

/// SHA-1 digest, the hash pack-v2 trailers are defined over.
#[derive(Clone, Debug, Default)]
pub struct Sha1Digest {
    inner: sha1::Sha1,
}

impl Sha1Digest {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: sha1::Sha1::new(),
        }
    }

    /// Convenience helper that digests `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 20] {
        let mut hasher = Self::new();
        PackDigest::update(&mut hasher, data);
        PackDigest::finalize(hasher)
    }
}

impl PackDigest for Sha1Digest {
    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(self) -> [u8; 20] {
        self.inner.finalize().into()
    }
}
