//! Validated sketch and harness configuration.
//!
//! Configuration types can only be built through their constructors, which
//! reject invalid parameters. Everything downstream of a built config is
//! infallible.

use crate::error::{Error, Result};
use crate::estimator::Variant;
use crate::{MAX_COMPACT_WIDTH, MAX_PRECISION, MIN_COMPACT_WIDTH, MIN_PRECISION};

/// Suggested number of stream elements between checkpoints
pub const DEFAULT_STEP_SIZE: usize = 5000;

/// Register bank parameters shared by all banks of a `StreamSketch`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize))]
pub struct SketchConfig {
    precision: u8,
    compact_width: u8,
    variants: Vec<Variant>,
}

impl SketchConfig {
    /// Creates new `SketchConfig`.
    ///
    /// - `precision`: number of bucket selector bits `B` in [4..18] range.
    /// - `compact_width`: register width of `Compact` variant in [4..6] range.
    /// - `variants`: non-empty list of estimator variants, duplicates are dropped.
    pub fn new(precision: u8, compact_width: u8, variants: &[Variant]) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::InvalidPrecision(precision));
        }
        if !(MIN_COMPACT_WIDTH..=MAX_COMPACT_WIDTH).contains(&compact_width) {
            return Err(Error::InvalidRegisterWidth(compact_width));
        }
        let mut unique = Vec::with_capacity(variants.len());
        for &variant in variants {
            if !unique.contains(&variant) {
                unique.push(variant);
            }
        }
        if unique.is_empty() {
            return Err(Error::NoVariants);
        }
        Ok(Self {
            precision,
            compact_width,
            variants: unique,
        })
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    #[inline]
    pub fn compact_width(&self) -> u8 {
        self.compact_width
    }

    #[inline]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Number of registers `m = 2^B`
    #[inline]
    pub fn num_registers(&self) -> usize {
        1 << self.precision
    }
}

/// Trial harness parameters
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize))]
pub struct HarnessConfig {
    sketch: SketchConfig,
    step_size: usize,
    trials: usize,
    stream_len: usize,
    seed: u64,
    threads: Option<usize>,
}

impl HarnessConfig {
    /// Creates new `HarnessConfig`.
    ///
    /// - `step_size`: number of stream elements between checkpoints, positive.
    /// - `trials`: number of independent trials, positive.
    /// - `stream_len`: number of elements generated for every trial.
    /// - `seed`: base seed, trial seeds are derived from it.
    pub fn new(
        sketch: SketchConfig,
        step_size: usize,
        trials: usize,
        stream_len: usize,
        seed: u64,
    ) -> Result<Self> {
        if step_size == 0 {
            return Err(Error::ZeroStepSize);
        }
        if trials == 0 {
            return Err(Error::ZeroTrials);
        }
        Ok(Self {
            sketch,
            step_size,
            trials,
            stream_len,
            seed,
            threads: None,
        })
    }

    /// Run trials on a dedicated pool of `threads` workers instead of the global pool
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[inline]
    pub fn sketch(&self) -> &SketchConfig {
        &self.sketch
    }

    #[inline]
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    #[inline]
    pub fn trials(&self) -> usize {
        self.trials
    }

    #[inline]
    pub fn stream_len(&self) -> usize {
        self.stream_len
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn threads(&self) -> Option<usize> {
        self.threads
    }

    /// Return number of checkpoints recorded per trial, including the final partial step
    pub fn num_checkpoints(&self) -> usize {
        self.stream_len.div_ceil(self.step_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(3, 5 => matches Err(Error::InvalidPrecision(3)))]
    #[test_case(19, 5 => matches Err(Error::InvalidPrecision(19)))]
    #[test_case(10, 3 => matches Err(Error::InvalidRegisterWidth(3)))]
    #[test_case(10, 7 => matches Err(Error::InvalidRegisterWidth(7)))]
    #[test_case(10, 5 => matches Ok(_))]
    fn test_sketch_config(precision: u8, width: u8) -> Result<SketchConfig> {
        SketchConfig::new(precision, width, &Variant::ALL)
    }

    #[test]
    fn test_variants_required_and_deduplicated() {
        assert_eq!(SketchConfig::new(10, 5, &[]), Err(Error::NoVariants));

        let config =
            SketchConfig::new(10, 5, &[Variant::Compact, Variant::Standard, Variant::Compact])
                .unwrap();
        assert_eq!(config.variants(), &[Variant::Compact, Variant::Standard]);
        assert_eq!(config.num_registers(), 1024);
    }

    #[test_case(0, 10 => matches Err(Error::ZeroStepSize))]
    #[test_case(5000, 0 => matches Err(Error::ZeroTrials))]
    #[test_case(5000, 10 => matches Ok(_))]
    fn test_harness_config(step_size: usize, trials: usize) -> Result<HarnessConfig> {
        let sketch = SketchConfig::new(10, 5, &Variant::ALL)?;
        HarnessConfig::new(sketch, step_size, trials, 100_000, 1)
    }

    #[test_case(100_000, 5000 => 20)]
    #[test_case(100_001, 5000 => 21)]
    #[test_case(10, 5000 => 1)]
    #[test_case(0, 5000 => 0)]
    fn test_num_checkpoints(stream_len: usize, step_size: usize) -> usize {
        let sketch = SketchConfig::new(10, 5, &Variant::ALL).unwrap();
        HarnessConfig::new(sketch, step_size, 1, stream_len, 1)
            .unwrap()
            .num_checkpoints()
    }
}
