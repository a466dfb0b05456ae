//! K-Nearest Neighbors regression
//!
//! Euclidean distance; equal distances are ordered by training-row index so
//! the neighbor set is deterministic.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{RegsearchError, Result};

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.config.n_neighbors
    }

    /// Store the training data. `k` must lie in `1..=n_samples`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(RegsearchError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        let k = self.config.n_neighbors;
        if k == 0 || k > x.nrows() {
            return Err(RegsearchError::ConfigError(format!(
                "k = {} must be between 1 and the {} training rows",
                k,
                x.nrows()
            )));
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict target values (parallelized over query rows)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(RegsearchError::ConfigError(
                    "KNN regressor used before fit".to_string(),
                ))
            }
        };
        if x.ncols() != x_train.ncols() {
            return Err(RegsearchError::ShapeError {
                expected: format!("{} feature columns", x_train.ncols()),
                actual: format!("{} feature columns", x.ncols()),
            });
        }

        let k = self.config.n_neighbors;
        let weights = self.config.weights;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k);
                weighted_mean_from(&neighbors, weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Max-heap entry ordered by (distance, training index)
struct Neighbor {
    dist: f64,
    index: usize,
    target: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.index.cmp(&other.index))
    }
}

/// Find the k nearest training rows with a bounded max-heap, O(n log k).
/// Returns `(distance, target)` pairs.
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (index, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor {
            dist: euclidean(point, row),
            index,
            target: y_train[index],
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_iter().map(|n| (n.dist, n.target)).collect()
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| {
            let d = ai - bi;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Compute weighted mean for regression
fn weighted_mean_from(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let uniform = || neighbors.iter().map(|(_, y)| y).sum::<f64>() / neighbors.len() as f64;
    match weights {
        WeightScheme::Uniform => uniform(),
        WeightScheme::Distance => {
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for &(dist, y) in neighbors {
                let w = 1.0 / (dist + 1e-10);
                weighted_sum += w * y;
                weight_total += w;
            }
            if weight_total > 0.0 {
                weighted_sum / weight_total
            } else {
                uniform()
            }
        }
    }
}
