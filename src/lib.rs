//! `cardinality-trials` is a Rust crate to estimate the number of distinct elements in a stream
//! with three HyperLogLog variants and to measure their accuracy over many independent trials.
//!
//! - `Standard`: raw HyperLogLog with linear counting and large range corrections.
//! - `Improved`: historic inverse probability estimate, falling back to LogLog-Beta once merged.
//! - `Compact`: `Standard` over bit-packed registers of 4 to 6 bits with saturation correction.
//!
//! ```
//! use cardinality_trials::{SketchConfig, StreamSketch, Variant};
//!
//! let config = SketchConfig::new(10, 5, &Variant::ALL).unwrap();
//! let mut sketch = StreamSketch::new(&config, 42);
//! for i in 0..10_000u64 {
//!     sketch.ingest(i);
//! }
//! let checkpoint = sketch.checkpoint();
//! assert_eq!(checkpoint.true_count, Some(10_000));
//! for (variant, estimate) in checkpoint.estimates {
//!     assert!((estimate - 10_000.0).abs() < 1_000.0, "{variant}: {estimate}");
//! }
//! ```
pub mod bank;
mod beta;
pub mod config;
pub mod error;
pub mod estimator;
pub mod harness;
pub mod hash;
mod registers;
pub mod sketch;
pub mod stats;
pub mod stream;

pub use bank::{Encoding, RegisterBank};
pub use config::{HarnessConfig, SketchConfig, DEFAULT_STEP_SIZE};
pub use error::{Error, Result};
pub use estimator::Variant;
pub use harness::{TrialHarness, TrialSeeds};
pub use hash::HashMapper;
pub use sketch::{Checkpoint, StreamSketch};
pub use stats::{StatisticsTable, Summary, TrialStatistics, VariantStatistics};
pub use stream::{BoundedIntegers, ElementSource, RandomIntegers, RandomStrings};

/// Minimal number of bucket selector bits
pub const MIN_PRECISION: u8 = 4;
/// Maximal number of bucket selector bits
pub const MAX_PRECISION: u8 = 18;
/// Minimal register width of `Compact` banks
pub const MIN_COMPACT_WIDTH: u8 = 4;
/// Maximal register width of `Compact` banks
pub const MAX_COMPACT_WIDTH: u8 = 6;
