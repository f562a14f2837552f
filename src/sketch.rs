//! Stream sketch feeding one register bank per estimator variant.

use std::hash::Hash;

use hashbrown::HashSet;

use crate::bank::RegisterBank;
use crate::config::SketchConfig;
use crate::error::{Error, Result};
use crate::estimator::Variant;
use crate::hash::HashMapper;

/// Estimates of all variants at one point of the stream
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Number of elements ingested so far, duplicates included
    pub elements: u64,
    /// Exact number of distinct elements, if ground truth is tracked
    pub true_count: Option<u64>,
    /// Estimate per variant, in configuration order
    pub estimates: Vec<(Variant, f64)>,
}

impl Checkpoint {
    /// Return estimate of `variant`
    pub fn estimate(&self, variant: Variant) -> Option<f64> {
        self.estimates
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|&(_, estimate)| estimate)
    }
}

/// Consumes a stream once and keeps a register bank per configured variant.
///
/// Every element is hashed once and the leaf is fed to all banks. An exact
/// set of seen elements may be kept alongside to validate the estimates.
#[derive(Debug, Clone)]
pub struct StreamSketch<T> {
    mapper: HashMapper,
    banks: Vec<(Variant, RegisterBank)>,
    exact: Option<HashSet<T>>,
    ingested: u64,
}

impl<T: Hash + Eq> StreamSketch<T> {
    /// Creates new `StreamSketch` tracking exact distinct count
    pub fn new(config: &SketchConfig, seed: u64) -> Self {
        Self::build(config, seed, Some(HashSet::new()))
    }

    /// Creates new `StreamSketch` keeping only register banks
    pub fn without_ground_truth(config: &SketchConfig, seed: u64) -> Self {
        Self::build(config, seed, None)
    }

    fn build(config: &SketchConfig, seed: u64, exact: Option<HashSet<T>>) -> Self {
        let banks = config
            .variants()
            .iter()
            .map(|&variant| {
                let encoding = variant.encoding(config.compact_width());
                let bank = RegisterBank::with_valid_params(config.precision(), encoding);
                (variant, bank)
            })
            .collect();
        Self {
            mapper: HashMapper::new(seed),
            banks,
            exact,
            ingested: 0,
        }
    }

    /// Ingest stream element
    #[inline]
    pub fn ingest(&mut self, element: T) {
        let leaf = self.mapper.hash(&element);
        self.ingest_hash(leaf);
        if let Some(exact) = self.exact.as_mut() {
            exact.insert(element);
        }
    }

    /// Ingest an already hashed element. Ground truth is not updated.
    #[inline]
    pub fn ingest_hash(&mut self, leaf: u64) {
        for (_, bank) in self.banks.iter_mut() {
            bank.update(leaf);
        }
        self.ingested += 1;
    }

    /// Return estimates of all variants without modifying the sketch
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            elements: self.ingested,
            true_count: self.true_count(),
            estimates: self
                .banks
                .iter()
                .map(|(variant, bank)| (*variant, variant.estimate(bank)))
                .collect(),
        }
    }

    /// Return estimate of `variant`, if configured
    pub fn estimate(&self, variant: Variant) -> Option<f64> {
        self.bank(variant).map(|bank| variant.estimate(bank))
    }

    /// Return register bank of `variant`, if configured
    pub fn bank(&self, variant: Variant) -> Option<&RegisterBank> {
        self.banks
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, bank)| bank)
    }

    /// Return exact number of distinct elements, if ground truth is tracked
    #[inline]
    pub fn true_count(&self) -> Option<u64> {
        self.exact.as_ref().map(|exact| exact.len() as u64)
    }

    /// Return number of elements ingested, duplicates included
    #[inline]
    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Return seed of the element hasher
    #[inline]
    pub fn seed(&self) -> u64 {
        self.mapper.seed()
    }

    /// Reset banks, ground truth, and element count
    pub fn clear(&mut self) {
        for (_, bank) in self.banks.iter_mut() {
            bank.clear();
        }
        if let Some(exact) = self.exact.as_mut() {
            exact.clear();
        }
        self.ingested = 0;
    }
}

impl<T: Hash + Eq + Clone> StreamSketch<T> {
    /// Merge `rhs` into `self`.
    ///
    /// Both sketches must share the hash seed and the variant list. Ground
    /// truth is kept only when both sketches track it.
    pub fn merge(&mut self, rhs: &StreamSketch<T>) -> Result<()> {
        if self.mapper != rhs.mapper {
            return Err(Error::IncompatibleBanks(format!(
                "hash seed {} vs {}",
                self.mapper.seed(),
                rhs.mapper.seed()
            )));
        }
        let lhs_variants = self.banks.iter().map(|(variant, _)| variant);
        if !lhs_variants.eq(rhs.banks.iter().map(|(variant, _)| variant)) {
            return Err(Error::IncompatibleBanks("variant lists differ".to_string()));
        }
        // check every pair before mutating any bank
        for ((_, lhs), (_, rhs)) in self.banks.iter().zip(rhs.banks.iter()) {
            if lhs.precision() != rhs.precision() || lhs.encoding() != rhs.encoding() {
                return Err(Error::IncompatibleBanks(format!(
                    "{:?} vs {:?}",
                    lhs.encoding(),
                    rhs.encoding()
                )));
            }
        }

        for ((_, lhs), (_, rhs)) in self.banks.iter_mut().zip(rhs.banks.iter()) {
            lhs.merge(rhs)?;
        }
        self.exact = match (self.exact.take(), rhs.exact.as_ref()) {
            (Some(mut lhs), Some(rhs)) => {
                lhs.extend(rhs.iter().cloned());
                Some(lhs)
            }
            _ => None,
        };
        self.ingested += rhs.ingested;
        Ok(())
    }
}
