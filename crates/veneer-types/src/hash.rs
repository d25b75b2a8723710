//! Content hashes.
//!
//! Every byte string the cache sees (overlay text, disk content) is keyed by
//! its BLAKE3 digest. Comparing two hashes is how the overlay store decides
//! whether an editor buffer matches what is on disk.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-byte BLAKE3 digest of some file content.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// The all-zero hash. Stands for "no content known", e.g. a file that
    /// failed to read. Never produced by [`ContentHash::of`] in practice.
    pub const ZERO: ContentHash = ContentHash([0; 32]);

    /// Hash a byte string.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs only. Never a lookup key.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }

    /// Parse a 64-character hex string.
    pub fn parse(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }

    /// Fold another hash into this one.
    ///
    /// XOR is commutative, so folding a set of hashes yields the same key
    /// regardless of iteration order (useful for unordered overlay sets).
    pub fn xor_with(&mut self, other: ContentHash) {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a ^= b;
        }
    }

    /// Check whether this is [`ContentHash::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}
