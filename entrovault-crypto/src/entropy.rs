//! Entropy accumulation.
//!
//! An [`EntropyAccumulator`] holds an ordered list of entropy sources and folds
//! them into a single digest on demand. Each source is appended to the running
//! buffer which is then replaced by its digest, so the result depends on every
//! source and on their order. The fold is recomputed on every call and never
//! cached.

use std::fmt;

use rand::TryRngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::error::{CryptoError, CryptoResult};

/// Sizes of the sources added by [`EntropyAccumulator::with_random_sources`].
const RANDOM_SOURCE_SIZES: [usize; 8] = [2, 4, 8, 16, 32, 64, 128, 256];

/// One entropy input. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EntropySource(Vec<u8>);

impl EntropySource {
    /// Raw bytes used as-is.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// UTF-8 encoding of a value's textual representation.
    pub fn from_display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Self(value.to_string().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EntropySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntropySource({} bytes)", self.0.len())
    }
}

impl From<&[u8]> for EntropySource {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for EntropySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<const N: usize> From<[u8; N]> for EntropySource {
    fn from(bytes: [u8; N]) -> Self {
        Self::from_bytes(bytes.to_vec())
    }
}

impl From<&str> for EntropySource {
    fn from(text: &str) -> Self {
        Self::from_display(text)
    }
}

impl From<String> for EntropySource {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

/// Ordered collection of entropy sources reduced through iterative digesting.
#[derive(Clone)]
pub struct EntropyAccumulator {
    sources: Vec<EntropySource>,
    digest: DigestAlgorithm,
}

impl EntropyAccumulator {
    /// Empty accumulator folding with SHA3-256.
    pub fn new() -> Self {
        Self::with_digest(DigestAlgorithm::Sha3_256)
    }

    /// Empty accumulator folding with the given digest.
    pub fn with_digest(digest: DigestAlgorithm) -> Self {
        Self {
            sources: Vec::new(),
            digest,
        }
    }

    /// Builds an accumulator from sources in iteration order.
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntropySource>,
    {
        let mut acc = Self::new();
        acc.extend(sources);
        acc
    }

    /// Adds eight CSPRNG sources of 2, 4, 8, ..., 256 bytes.
    ///
    /// Data encrypted with such an accumulator can only be decrypted by a clone
    /// of it, since the sources are never persisted.
    pub fn with_random_sources() -> CryptoResult<Self> {
        let mut acc = Self::new();
        for size in RANDOM_SOURCE_SIZES {
            acc.push(EntropySource(random_bytes(size)?.to_vec()));
        }
        Ok(acc)
    }

    pub fn push(&mut self, source: impl Into<EntropySource>) -> &mut Self {
        self.sources.push(source.into());
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.push(EntropySource::from_bytes(bytes))
    }

    pub fn push_display<T: fmt::Display + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.push(EntropySource::from_display(value))
    }

    pub fn extend<I, S>(&mut self, sources: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntropySource>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Inserts `source` before all existing sources.
    pub(crate) fn prepend(&mut self, source: EntropySource) {
        self.sources.insert(0, source);
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Folds every stored source, then `extra` if non-empty, into one digest.
    ///
    /// With no sources and no extra entropy the result is empty.
    pub fn reduce(&self, extra: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let extra = extra.filter(|e| !e.is_empty());
        let mut buffer = Zeroizing::new(Vec::new());
        for source in self
            .sources
            .iter()
            .map(EntropySource::as_bytes)
            .chain(extra)
        {
            // Sized up front so the running digest is never moved by a reallocation.
            let mut input = Zeroizing::new(Vec::with_capacity(buffer.len() + source.len()));
            input.extend_from_slice(&buffer);
            input.extend_from_slice(source);
            buffer = Zeroizing::new(self.digest.hash(&input));
        }
        buffer
    }
}

impl Default for EntropyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntropyAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntropyAccumulator")
            .field("sources", &self.sources.len())
            .field("digest", &self.digest)
            .finish()
    }
}

impl<S: Into<EntropySource>> FromIterator<S> for EntropyAccumulator {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_sources(iter)
    }
}

/// Fills a fresh buffer from the operating system CSPRNG.
pub(crate) fn random_bytes(len: usize) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(buf)
}
