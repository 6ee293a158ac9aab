//! 32-bit FNV-1a, the table's only hash function.
//!
//! The function is unseeded and deterministic: equal bytes always land in
//! the same bucket, across tables and across runs. That also means it offers
//! no protection against hash flooding, so do not key a table with untrusted
//! input if worst-case latency matters.

use core::hash::{BuildHasher, Hasher};

const OFFSET_BASIS: u32 = 0x811C_9DC5;
const PRIME: u32 = 0x0100_0193;

/// Hashes `bytes` with 32-bit FNV-1a.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    fold(OFFSET_BASIS, bytes)
}

#[inline(always)]
fn fold(hash: u32, bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(hash, |h, &b| (u32::from(b) ^ h).wrapping_mul(PRIME))
}

/// Streaming form of [`fnv1a_32`].
///
/// Writing several slices is equivalent to hashing their concatenation.
/// `finish` widens the 32-bit state without mixing.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1aHasher {
    hash: u32,
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self { hash: OFFSET_BASIS }
    }
}

impl Fnv1aHasher {
    /// The 32-bit digest of everything written so far.
    #[inline]
    pub fn finish32(&self) -> u32 {
        self.hash
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.hash = fold(self.hash, bytes);
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.hash)
    }
}

/// A `BuildHasher` producing fresh [`Fnv1aHasher`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fnv1aBuildHasher;

impl BuildHasher for Fnv1aBuildHasher {
    type Hasher = Fnv1aHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        Fnv1aHasher::default()
    }
}
