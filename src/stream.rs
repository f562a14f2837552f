//! Element sources used to generate trial streams.
//!
//! A source draws elements from a caller-provided RNG, so every trial
//! regenerates its own stream from its own seed and no random state is
//! shared between trials.

use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of stream elements
pub trait ElementSource: Sync {
    type Element: Hash + Eq + Send;

    /// Draw next element using `rng`
    fn next_element(&self, rng: &mut StdRng) -> Self::Element;

    /// Generate `len` elements from `seed`
    fn generate(&self, seed: u64, len: usize) -> Vec<Self::Element> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| self.next_element(&mut rng)).collect()
    }
}

/// Alphabet of `RandomStrings`
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";

/// Random strings over `[a-zA-Z0-9-]` with length in `[min_len..=max_len]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomStrings {
    min_len: usize,
    max_len: usize,
}

impl RandomStrings {
    /// Creates new source; bounds are swapped if given in reverse order
    pub fn new(min_len: usize, max_len: usize) -> Self {
        let (min_len, max_len) = if min_len <= max_len {
            (min_len, max_len)
        } else {
            (max_len, min_len)
        };
        Self {
            min_len: min_len.max(1),
            max_len: max_len.max(1),
        }
    }
}

impl Default for RandomStrings {
    fn default() -> Self {
        Self::new(1, 30)
    }
}

impl ElementSource for RandomStrings {
    type Element = String;

    fn next_element(&self, rng: &mut StdRng) -> String {
        let len = rng.gen_range(self.min_len..=self.max_len);
        (0..len)
            .map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())]))
            .collect()
    }
}

/// Uniformly distributed `u64` values; distinct with overwhelming probability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomIntegers;

impl ElementSource for RandomIntegers {
    type Element = u64;

    #[inline]
    fn next_element(&self, rng: &mut StdRng) -> u64 {
        rng.gen()
    }
}

/// Values drawn uniformly from `[0..universe)`, producing duplicates once
/// the stream is longer than a fraction of the universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedIntegers {
    universe: u64,
}

impl BoundedIntegers {
    pub fn new(universe: u64) -> Self {
        Self {
            universe: universe.max(1),
        }
    }
}

impl ElementSource for BoundedIntegers {
    type Element = u64;

    #[inline]
    fn next_element(&self, rng: &mut StdRng) -> u64 {
        rng.gen_range(0..self.universe)
    }
}
