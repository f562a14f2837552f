//! Seeded element hashing.

use std::hash::{Hash, Hasher};

use wyhash::WyHash;

/// Maps elements to uniformly distributed 64-bit leaves.
///
/// The same seed always maps the same element to the same leaf, so a trial
/// is reproducible from its seed. Different trials use different seeds to
/// decorrelate their errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashMapper {
    seed: u64,
}

impl HashMapper {
    /// Creates new `HashMapper` using `seed`
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Return seed of this mapper
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Hash `item` into a 64-bit leaf
    #[inline]
    pub fn hash<T: Hash + ?Sized>(&self, item: &T) -> u64 {
        let mut hasher = WyHash::with_seed(self.seed);
        item.hash(&mut hasher);
        hasher.finish()
    }
}
