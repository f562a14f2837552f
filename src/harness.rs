//! Multi-trial accuracy harness.
//!
//! Every trial regenerates its own stream from seeds derived from the base
//! seed, feeds a fresh `StreamSketch` and records a checkpoint every
//! `step_size` elements. Trials run on a rayon pool; their checkpoints are
//! collected in trial order and reduced sequentially afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::sketch::{Checkpoint, StreamSketch};
use crate::stats::{Aggregator, StatisticsTable};
use crate::stream::ElementSource;

/// Seeds of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialSeeds {
    /// Seed of the element hasher
    pub hash: u64,
    /// Seed of the element stream
    pub stream: u64,
}

impl TrialSeeds {
    /// Derive seeds of trial `trial` from `base`
    pub fn derive(base: u64, trial: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(base.wrapping_add(trial as u64));
        Self {
            hash: rng.gen(),
            stream: rng.gen(),
        }
    }
}

/// Runs independent trials of all configured variants over streams drawn
/// from an `ElementSource`
pub struct TrialHarness<S> {
    config: HarnessConfig,
    source: S,
    pool: Option<ThreadPool>,
}

impl<S: ElementSource> TrialHarness<S> {
    /// Creates new `TrialHarness`, building a dedicated thread pool if
    /// `config` asks for a fixed number of threads
    pub fn new(config: HarnessConfig, source: S) -> Result<Self> {
        let pool = config
            .threads()
            .map(|threads| {
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|idx| format!("trial-{idx}"))
                    .build()
            })
            .transpose()?;
        Ok(Self {
            config,
            source,
            pool,
        })
    }

    #[inline]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run all trials and aggregate their checkpoints
    pub fn run(&self) -> StatisticsTable {
        let never = AtomicBool::new(false);
        self.run_until(&never)
            .unwrap_or_else(|| StatisticsTable::empty(self.config.sketch().variants()))
    }

    /// Run all trials unless `cancel` is raised, in which case `None` is
    /// returned and partial results are dropped
    pub fn run_until(&self, cancel: &AtomicBool) -> Option<StatisticsTable> {
        info!(
            trials = self.config.trials(),
            stream_len = self.config.stream_len(),
            step_size = self.config.step_size(),
            precision = self.config.sketch().precision(),
            seed = self.config.seed(),
            "starting trials"
        );
        let started = Instant::now();

        let records = match &self.pool {
            Some(pool) => pool.install(|| self.run_trials(cancel)),
            None => self.run_trials(cancel),
        };
        let Some(records) = records else {
            info!("trials cancelled");
            return None;
        };

        let mut aggregator = Aggregator::new(self.config.sketch().variants());
        for checkpoints in &records {
            aggregator.add_trial(checkpoints);
        }
        let table = aggregator.finish();
        info!(
            rows = table.rows().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trials finished"
        );
        Some(table)
    }

    /// Run a single trial and return its checkpoints
    pub fn run_trial(&self, trial: usize) -> Vec<Checkpoint> {
        let never = AtomicBool::new(false);
        self.trial_until(trial, &never).unwrap_or_default()
    }

    fn run_trials(&self, cancel: &AtomicBool) -> Option<Vec<Vec<Checkpoint>>> {
        (0..self.config.trials())
            .into_par_iter()
            .map(|trial| self.trial_until(trial, cancel))
            .collect()
    }

    fn trial_until(&self, trial: usize, cancel: &AtomicBool) -> Option<Vec<Checkpoint>> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        let seeds = TrialSeeds::derive(self.config.seed(), trial);
        let mut rng = StdRng::seed_from_u64(seeds.stream);
        let mut sketch = StreamSketch::new(self.config.sketch(), seeds.hash);
        let step_size = self.config.step_size();
        let stream_len = self.config.stream_len();
        let mut checkpoints = Vec::with_capacity(self.config.num_checkpoints());

        for elements in 1..=stream_len {
            sketch.ingest(self.source.next_element(&mut rng));
            if elements % step_size == 0 || elements == stream_len {
                if cancel.load(Ordering::Relaxed) {
                    debug!(trial, elements, "trial cancelled");
                    return None;
                }
                checkpoints.push(sketch.checkpoint());
            }
        }

        debug!(
            trial,
            hash_seed = seeds.hash,
            true_count = sketch.true_count().unwrap_or(0),
            "trial finished"
        );
        Some(checkpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SketchConfig;
    use crate::estimator::Variant;
    use crate::stream::{BoundedIntegers, RandomIntegers, RandomStrings};

    fn config(trials: usize, stream_len: usize, step_size: usize) -> HarnessConfig {
        let sketch = SketchConfig::new(8, 5, &Variant::ALL).unwrap();
        HarnessConfig::new(sketch, step_size, trials, stream_len, 7).unwrap()
    }

    #[test]
    fn test_trial_seeds() {
        assert_eq!(TrialSeeds::derive(1, 0), TrialSeeds::derive(1, 0));
        assert_ne!(TrialSeeds::derive(1, 0), TrialSeeds::derive(1, 1));
        let seeds = TrialSeeds::derive(1, 0);
        assert_ne!(seeds.hash, seeds.stream);
    }

    #[test]
    fn test_checkpoints() {
        let harness = TrialHarness::new(config(1, 2500, 1000), RandomIntegers).unwrap();
        let checkpoints = harness.run_trial(0);
        let steps: Vec<u64> = checkpoints.iter().map(|c| c.elements).collect();
        assert_eq!(steps, [1000, 2000, 2500]);
        assert_eq!(checkpoints[2].true_count, Some(2500));
        assert_eq!(checkpoints[2].estimates.len(), 3);
    }

    #[test]
    fn test_run_table_shape() {
        let harness = TrialHarness::new(config(4, 3000, 1000), RandomStrings::default()).unwrap();
        let table = harness.run();
        assert_eq!(table.trials(), 4);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.header().len(), 2 + 3 * 3);
        for row in table.rows() {
            assert_eq!(row.variants.len(), 3);
            for stats in &row.variants {
                assert!(stats.mean_estimate > 0.0);
                assert!(stats.mean_relative_error < 0.5);
            }
        }
    }

    #[test]
    fn test_deterministic_across_thread_counts() {
        let single = TrialHarness::new(config(6, 2000, 500).with_threads(1), BoundedIntegers::new(800))
            .unwrap()
            .run();
        let multi = TrialHarness::new(config(6, 2000, 500).with_threads(4), BoundedIntegers::new(800))
            .unwrap()
            .run();
        let global = TrialHarness::new(config(6, 2000, 500), BoundedIntegers::new(800))
            .unwrap()
            .run();
        assert_eq!(single, multi);
        assert_eq!(single, global);
    }

    #[test]
    fn test_cancelled_run() {
        let harness = TrialHarness::new(config(3, 1000, 100), RandomIntegers).unwrap();
        let cancel = AtomicBool::new(true);
        assert_eq!(harness.run_until(&cancel), None);
    }

    #[test]
    fn test_empty_stream() {
        let harness = TrialHarness::new(config(2, 0, 100), RandomIntegers).unwrap();
        let table = harness.run();
        assert_eq!(table.trials(), 2);
        assert!(table.rows().is_empty());
    }
}
