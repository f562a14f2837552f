//! ## Register bank
//! A bank of `m = 2^P` registers, each holding the maximum rank observed
//! for its bucket. The low `P` bits of a 64-bit leaf select the bucket and
//! the remaining `64 - P` bits give the rank: number of leading zeros plus one.
//!
//! Three encodings are supported:
//! - `Byte`: one byte per register.
//! - `ByteWithHistory`: one byte per register plus a historic inverse
//!   probability (HIP) accumulator, updated every time a register changes.
//! - `Packed(W)`: `W` bits per register; ranks above `2^W - 1` saturate.
//!
//! Number of zero registers and the harmonic sum of registers are updated
//! incrementally, so the HIP accumulator update is constant time.

use std::fmt::{Debug, Formatter};

use crate::error::{Error, Result};
use crate::registers::{Dense, Packed, RegisterStorage, Storage};
use crate::{MAX_COMPACT_WIDTH, MAX_PRECISION, MIN_COMPACT_WIDTH, MIN_PRECISION};

/// Register encoding of a `RegisterBank`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Encoding {
    /// One byte per register
    Byte,
    /// One byte per register plus historic estimate
    ByteWithHistory,
    /// Given number of bits per register
    Packed(u8),
}

/// Historic inverse probability accumulator
#[derive(Debug, Clone, Copy, PartialEq)]
struct History {
    estimate: f64,
    /// Cleared once the bank absorbs registers it has not observed itself
    in_order: bool,
}

#[derive(Clone)]
pub struct RegisterBank {
    precision: u8,
    encoding: Encoding,
    storage: Storage,
    zeros: usize,
    harmonic_sum: f64,
    history: Option<History>,
}

impl RegisterBank {
    /// Creates new empty `RegisterBank` with `2^precision` registers
    pub fn new(precision: u8, encoding: Encoding) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::InvalidPrecision(precision));
        }
        if let Encoding::Packed(width) = encoding {
            if !(MIN_COMPACT_WIDTH..=MAX_COMPACT_WIDTH).contains(&width) {
                return Err(Error::InvalidRegisterWidth(width));
            }
        }
        Ok(Self::with_valid_params(precision, encoding))
    }

    /// Creates new `RegisterBank` from already validated parameters
    pub(crate) fn with_valid_params(precision: u8, encoding: Encoding) -> Self {
        let m = 1usize << precision;
        let (storage, history) = match encoding {
            Encoding::Byte => (Dense::new(m).into(), None),
            Encoding::ByteWithHistory => (
                Dense::new(m).into(),
                Some(History {
                    estimate: 0.0,
                    in_order: true,
                }),
            ),
            Encoding::Packed(width) => (Packed::new(m, width).into(), None),
        };
        Self {
            precision,
            encoding,
            storage,
            zeros: m,
            harmonic_sum: m as f64,
            history,
        }
    }

    /// Return precision (number of bucket selector bits)
    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Return register encoding
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Return number of registers
    #[inline]
    pub fn num_registers(&self) -> usize {
        self.storage.len()
    }

    /// Return largest value a register may hold
    #[inline]
    pub fn max_value(&self) -> u8 {
        self.storage.max_value()
    }

    /// Return value of `idx` register
    #[inline]
    pub fn register(&self, idx: usize) -> u8 {
        self.storage.get(idx)
    }

    /// Iterate over all register values
    pub fn registers(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.num_registers()).map(|idx| self.storage.get(idx))
    }

    /// Return number of registers set to 0
    #[inline]
    pub fn zero_registers(&self) -> usize {
        self.zeros
    }

    /// Return number of registers which observed at least one leaf
    #[inline]
    pub fn used_registers(&self) -> usize {
        self.num_registers() - self.zeros
    }

    /// Return memory footprint of register storage in bytes
    #[inline]
    pub fn storage_bytes(&self) -> usize {
        self.storage.storage_bytes()
    }

    /// Return number of registers holding each value in `[0..=max_value]`
    pub fn histogram(&self) -> Vec<u32> {
        let mut counts = vec![0u32; usize::from(self.max_value()) + 1];
        for value in self.registers() {
            counts[usize::from(value)] += 1;
        }
        counts
    }

    /// Return historic estimate if the bank has only been updated through `update`
    #[inline]
    pub fn historic_estimate(&self) -> Option<f64> {
        self.history
            .filter(|history| history.in_order)
            .map(|history| history.estimate)
    }

    /// Update the bank with a hashed leaf.
    /// Returns true if any register changed.
    #[inline]
    pub fn update(&mut self, leaf: u64) -> bool {
        let (idx, rank) = bucket_and_rank(leaf, self.precision);
        let new_rank = rank.min(self.max_value());
        let old_rank = self.storage.get(idx);
        if new_rank <= old_rank {
            return false;
        }

        // probability of this change is harmonic_sum / m
        if let Some(history) = self.history.as_mut() {
            history.estimate += self.storage.len() as f64 / self.harmonic_sum;
        }
        self.set_register(idx, old_rank, new_rank);
        true
    }

    /// Merge `rhs` into `self` by taking element-wise maximum of registers
    pub fn merge(&mut self, rhs: &RegisterBank) -> Result<()> {
        if self.precision != rhs.precision || self.encoding != rhs.encoding {
            return Err(Error::IncompatibleBanks(format!(
                "precision {} with {:?} vs precision {} with {:?}",
                self.precision, self.encoding, rhs.precision, rhs.encoding
            )));
        }
        if rhs.used_registers() == 0 {
            return Ok(());
        }

        for idx in 0..self.num_registers() {
            let lhs_rank = self.storage.get(idx);
            let rhs_rank = rhs.storage.get(idx);
            if rhs_rank > lhs_rank {
                self.set_register(idx, lhs_rank, rhs_rank);
            }
        }
        if let Some(history) = self.history.as_mut() {
            history.in_order = false;
        }
        Ok(())
    }

    /// Reset all registers and history
    pub fn clear(&mut self) {
        self.storage.clear();
        self.zeros = self.num_registers();
        self.harmonic_sum = self.num_registers() as f64;
        if let Some(history) = self.history.as_mut() {
            *history = History {
                estimate: 0.0,
                in_order: true,
            };
        }
    }

    /// Set `idx` register and update number of zero registers and harmonic sum
    #[inline]
    fn set_register(&mut self, idx: usize, old_rank: u8, new_rank: u8) {
        self.storage.set(idx, new_rank);
        if old_rank == 0 {
            self.zeros -= 1;
        }
        self.harmonic_sum += inv_pow2(new_rank) - inv_pow2(old_rank);
    }
}

impl PartialEq for RegisterBank {
    /// Banks are equal when their layout and register values are equal
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision
            && self.encoding == rhs.encoding
            && self.storage == rhs.storage
    }
}

impl Eq for RegisterBank {}

impl Debug for RegisterBank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, encoding: {:?}, used: {}, size: {} }}",
            self.precision,
            self.encoding,
            self.used_registers(),
            self.storage_bytes()
        )
    }
}

/// Split leaf into bucket index (low `precision` bits) and rank of the remaining bits.
///
/// Rank is in `[1..=65 - precision]` range; a leaf with all remaining bits
/// unset gets the largest rank.
#[inline]
pub fn bucket_and_rank(leaf: u64, precision: u8) -> (usize, u8) {
    let idx = (leaf & ((1 << precision) - 1)) as usize;
    let rest = leaf >> precision;
    let rank = if rest == 0 {
        64 - precision + 1
    } else {
        (rest.leading_zeros() - u32::from(precision) + 1) as u8
    };
    (idx, rank)
}

/// Return `2^-k`
#[inline]
pub(crate) fn inv_pow2(k: u8) -> f64 {
    1.0 / ((1u64 << k) as f64)
}
