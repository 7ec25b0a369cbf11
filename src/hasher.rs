//! Content digests used as the deduplication identity of a download.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a complete downloaded byte sequence.
///
/// Two downloads with identical bytes always produce equal digests, whatever
/// URL they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hashes a complete in-memory byte slice.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Returns the hex-encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentDigest {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Incremental hasher fed chunk by chunk while a body streams to disk.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHasher").finish_non_exhaustive()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Consumes the hasher and returns the digest of everything fed to it.
    #[must_use]
    pub fn finalize(self) -> ContentDigest {
        ContentDigest(hex::encode(self.inner.finalize()))
    }
}
