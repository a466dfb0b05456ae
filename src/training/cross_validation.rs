//! K-fold cross-validation

use crate::error::{RegsearchError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter.
///
/// Without a random state the folds are contiguous blocks in row order;
/// with one, rows are shuffled by a seeded ChaCha8 generator first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub random_state: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        Self {
            n_splits: 5,
            random_state: None,
        }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            random_state: None,
        }
    }

    /// Shuffle rows with a fixed seed before folding
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate the folds for `n_samples` rows.
    ///
    /// The first `n_samples % n_splits` folds hold one extra row. Every row
    /// appears in exactly one validation fold.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "cross-validation needs at least 2 folds, got {}",
                n_splits
            )));
        }
        if n_samples < n_splits {
            return Err(RegsearchError::ConfigError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.random_state {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Validation MSE for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}
