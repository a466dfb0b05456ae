//! Train/test partitioning

use super::Dataset;
use crate::error::{RegsearchError, Result};
use crate::preprocessing::{ScalerStats, ScalingPolicy, StandardScaler};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A train/test partition of one source dataset.
///
/// The index vectors refer to rows of the source dataset; together they
/// cover every row exactly once.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Number of held-out rows: `fraction * n` rounded half up
pub fn held_out_size(n_samples: usize, held_out_fraction: f64) -> usize {
    (held_out_fraction * n_samples as f64 + 0.5).floor() as usize
}

/// Partition `dataset` into train and test sides.
///
/// Row indices are shuffled with a ChaCha8 generator seeded from `seed`; the
/// first `held_out_size(n, fraction)` shuffled rows form the test side.
pub fn split(dataset: &Dataset, held_out_fraction: f64, seed: u64) -> Result<Split> {
    if !(held_out_fraction > 0.0 && held_out_fraction < 1.0) {
        return Err(RegsearchError::ConfigError(format!(
            "held-out fraction must be in (0, 1), got {}",
            held_out_fraction
        )));
    }

    let n_samples = dataset.n_samples();
    let n_test = held_out_size(n_samples, held_out_fraction);
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(RegsearchError::ConfigError(format!(
            "split of {} rows at fraction {} leaves an empty side (train = {}, test = {})",
            n_samples, held_out_fraction, n_train, n_test
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    Ok(Split {
        train: dataset.select_rows(&train_indices),
        test: dataset.select_rows(&test_indices),
        train_indices,
        test_indices,
    })
}

impl Split {
    /// Standardize both sides.
    ///
    /// With `ScalingPolicy::TrainStatistics` the returned stats come from the
    /// training side and are applied unchanged to the test side. With
    /// `ScalingPolicy::PerPartition` each side is scaled by its own
    /// statistics and the training stats are returned.
    pub fn standardize(&self, policy: ScalingPolicy) -> Result<(Split, ScalerStats)> {
        let stats = StandardScaler::fit(&self.train)?;
        let train = stats.transform(&self.train)?;
        let test = match policy {
            ScalingPolicy::TrainStatistics => stats.transform(&self.test)?,
            ScalingPolicy::PerPartition => StandardScaler::fit(&self.test)?.transform(&self.test)?,
        };

        Ok((
            Split {
                train,
                test,
                train_indices: self.train_indices.clone(),
                test_indices: self.test_indices.clone(),
            },
            stats,
        ))
    }
}
