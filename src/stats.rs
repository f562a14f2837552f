//! Per-checkpoint accuracy statistics aggregated over trials.

use crate::estimator::Variant;
use crate::sketch::Checkpoint;

/// Accuracy of one variant at one checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantStatistics {
    pub variant: Variant,
    /// Mean estimate over trials
    pub mean_estimate: f64,
    /// Sample standard deviation of the estimate over trials
    pub std_estimate: f64,
    /// Mean over trials of `|estimate - true_count| / true_count`
    pub mean_relative_error: f64,
    /// `(mean_estimate - true_count) / true_count`, signed
    pub relative_bias: f64,
}

/// Statistics of all variants at one checkpoint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialStatistics {
    /// Number of stream elements ingested at this checkpoint
    pub step: u64,
    /// Exact distinct count, averaged over trials
    pub true_count: f64,
    pub variants: Vec<VariantStatistics>,
}

impl TrialStatistics {
    /// Return statistics of `variant`
    pub fn variant(&self, variant: Variant) -> Option<&VariantStatistics> {
        self.variants.iter().find(|stats| stats.variant == variant)
    }
}

/// Accuracy of one variant summarized over all checkpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub variant: Variant,
    /// Mean of `mean_relative_error` over checkpoints
    pub avg_error: f64,
    /// Largest `mean_relative_error` over checkpoints
    pub max_error: f64,
    /// Mean of `std_estimate / true_count` over checkpoints
    pub avg_relative_std: f64,
}

/// Immutable table of `TrialStatistics` rows, one per checkpoint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatisticsTable {
    trials: usize,
    variants: Vec<Variant>,
    rows: Vec<TrialStatistics>,
}

impl StatisticsTable {
    pub(crate) fn empty(variants: &[Variant]) -> Self {
        Self {
            trials: 0,
            variants: variants.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Return number of trials aggregated into the table
    #[inline]
    pub fn trials(&self) -> usize {
        self.trials
    }

    #[inline]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    #[inline]
    pub fn rows(&self) -> &[TrialStatistics] {
        &self.rows
    }

    /// Return statistics of the final checkpoint
    #[inline]
    pub fn last(&self) -> Option<&TrialStatistics> {
        self.rows.last()
    }

    /// Column names: `step, true_count, mean_<variant>, std_<variant>, error_<variant>, ...`
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["step".to_string(), "true_count".to_string()];
        for variant in &self.variants {
            header.push(format!("mean_{variant}"));
            header.push(format!("std_{variant}"));
            header.push(format!("error_{variant}"));
        }
        header
    }

    /// Rows formatted to match `header`; errors are given in percent
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = vec![row.step.to_string(), format!("{:.2}", row.true_count)];
                for stats in &row.variants {
                    record.push(format!("{:.2}", stats.mean_estimate));
                    record.push(format!("{:.2}", stats.std_estimate));
                    record.push(format!("{:.2}", stats.mean_relative_error * 100.0));
                }
                record
            })
            .collect()
    }

    /// Summarize accuracy of `variant` over all checkpoints
    pub fn summary(&self, variant: Variant) -> Option<Summary> {
        let stats: Vec<(f64, &VariantStatistics)> = self
            .rows
            .iter()
            .filter_map(|row| row.variant(variant).map(|stats| (row.true_count, stats)))
            .collect();
        if stats.is_empty() {
            return None;
        }

        let n = stats.len() as f64;
        let avg_error = stats.iter().map(|(_, s)| s.mean_relative_error).sum::<f64>() / n;
        let max_error = stats
            .iter()
            .map(|(_, s)| s.mean_relative_error)
            .fold(0.0, f64::max);
        let avg_relative_std = stats
            .iter()
            .map(|(truth, s)| relative(s.std_estimate, *truth))
            .sum::<f64>()
            / n;
        Some(Summary {
            variant,
            avg_error,
            max_error,
            avg_relative_std,
        })
    }
}

/// Running sums of one variant at one checkpoint
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    sum: f64,
    sum_sq: f64,
    sum_relative_error: f64,
}

#[derive(Debug, Clone)]
struct CheckpointSums {
    step: u64,
    trials: usize,
    sum_true: f64,
    moments: Vec<Moments>,
}

/// Reduces per-trial checkpoints into a `StatisticsTable`.
///
/// Sums are commutative; trials are nevertheless added in trial order so
/// results are bit-for-bit reproducible.
#[derive(Debug, Clone)]
pub(crate) struct Aggregator {
    variants: Vec<Variant>,
    trials: usize,
    checkpoints: Vec<CheckpointSums>,
}

impl Aggregator {
    pub(crate) fn new(variants: &[Variant]) -> Self {
        Self {
            variants: variants.to_vec(),
            trials: 0,
            checkpoints: Vec::new(),
        }
    }

    /// Add checkpoints of one trial
    pub(crate) fn add_trial(&mut self, checkpoints: &[Checkpoint]) {
        self.trials += 1;
        for (idx, checkpoint) in checkpoints.iter().enumerate() {
            if idx == self.checkpoints.len() {
                self.checkpoints.push(CheckpointSums {
                    step: checkpoint.elements,
                    trials: 0,
                    sum_true: 0.0,
                    moments: vec![Moments::default(); self.variants.len()],
                });
            }
            let sums = &mut self.checkpoints[idx];
            let truth = checkpoint.true_count.unwrap_or(0) as f64;
            sums.trials += 1;
            sums.sum_true += truth;
            for (moments, variant) in sums.moments.iter_mut().zip(&self.variants) {
                let estimate = checkpoint.estimate(*variant).unwrap_or(0.0);
                moments.sum += estimate;
                moments.sum_sq += estimate * estimate;
                moments.sum_relative_error += relative((estimate - truth).abs(), truth);
            }
        }
    }

    pub(crate) fn finish(self) -> StatisticsTable {
        let variants = self.variants;
        let rows = self
            .checkpoints
            .into_iter()
            .map(|sums| {
                let n = sums.trials as f64;
                let true_count = sums.sum_true / n;
                let stats = sums
                    .moments
                    .iter()
                    .zip(&variants)
                    .map(|(moments, &variant)| {
                        let mean_estimate = moments.sum / n;
                        VariantStatistics {
                            variant,
                            mean_estimate,
                            std_estimate: sample_std(moments, sums.trials),
                            mean_relative_error: moments.sum_relative_error / n,
                            relative_bias: relative(mean_estimate - true_count, true_count),
                        }
                    })
                    .collect();
                TrialStatistics {
                    step: sums.step,
                    true_count,
                    variants: stats,
                }
            })
            .collect();
        StatisticsTable {
            trials: self.trials,
            variants,
            rows,
        }
    }
}

/// Sample standard deviation from running sums
#[inline]
fn sample_std(moments: &Moments, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let n = n as f64;
    let variance = (moments.sum_sq - moments.sum * moments.sum / n) / (n - 1.0);
    variance.max(0.0).sqrt()
}

/// `value / truth`, 0 for empty truth
#[inline]
fn relative(value: f64, truth: f64) -> f64 {
    if truth > 0.0 {
        value / truth
    } else {
        0.0
    }
}
