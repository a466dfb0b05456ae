//! Synthetic regression data with a known generating formula

use crate::data::{Dataset, Formula};
use crate::error::{RegsearchError, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// `y = intercept + Σ w_i x_i + N(0, noise_std²)` over uniform features,
/// plus optional pure-noise distractor columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSpec {
    pub intercept: f64,
    pub weights: Vec<(String, f64)>,
    pub distractors: usize,
    pub noise_std: f64,
    pub feature_range: (f64, f64),
}

impl Default for LinearSpec {
    fn default() -> Self {
        Self {
            intercept: 0.0,
            weights: Vec::new(),
            distractors: 0,
            noise_std: 0.1,
            feature_range: (0.0, 10.0),
        }
    }
}

impl LinearSpec {
    pub fn new(intercept: f64) -> Self {
        Self {
            intercept,
            ..Default::default()
        }
    }

    /// Sale-price-like demo: four real drivers and two distractors
    pub fn housing() -> Self {
        Self::new(50.0)
            .with_predictor("sqft_living", 12.0)
            .with_predictor("grade", 8.0)
            .with_predictor("view", 5.0)
            .with_predictor("bathrooms", 3.0)
            .with_distractors(2)
            .with_noise(2.0)
    }

    pub fn with_predictor(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.weights.push((name.into(), weight));
        self
    }

    pub fn with_distractors(mut self, n: usize) -> Self {
        self.distractors = n;
        self
    }

    pub fn with_noise(mut self, std: f64) -> Self {
        self.noise_std = std;
        self
    }

    pub fn with_feature_range(mut self, low: f64, high: f64) -> Self {
        self.feature_range = (low, high);
        self
    }

    /// The predictors that drive the target
    pub fn formula(&self) -> Result<Formula> {
        Formula::from_names(self.weights.iter().map(|(n, _)| n.clone()))
    }

    /// Column names: generating predictors first, then `noise_0`, `noise_1`, ...
    pub fn schema(&self) -> Vec<String> {
        self.weights
            .iter()
            .map(|(n, _)| n.clone())
            .chain((0..self.distractors).map(|i| format!("noise_{}", i)))
            .collect()
    }

    /// Draw `n_rows` rows from a ChaCha8 generator seeded with `seed`
    pub fn generate(&self, n_rows: usize, seed: u64) -> Result<Dataset> {
        let (low, high) = self.feature_range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(RegsearchError::ConfigError(format!(
                "invalid feature range ({}, {})",
                low, high
            )));
        }
        if !(self.noise_std >= 0.0 && self.noise_std.is_finite()) {
            return Err(RegsearchError::ConfigError(format!(
                "noise std must be >= 0, got {}",
                self.noise_std
            )));
        }
        if n_rows == 0 {
            return Err(RegsearchError::ConfigError("cannot generate zero rows".to_string()));
        }

        let schema = self.schema();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = Array2::from_shape_simple_fn((n_rows, schema.len()), || rng.gen_range(low..high));

        let weights: Array1<f64> = self.weights.iter().map(|(_, w)| *w).collect();
        let mut y = Array1::from_elem(n_rows, self.intercept);
        for (i, row) in x.rows().into_iter().enumerate() {
            let signal: f64 = row.iter().zip(weights.iter()).map(|(v, w)| v * w).sum();
            y[i] += signal + self.noise_std * standard_normal(&mut rng);
        }

        Dataset::new(schema, x, y)
    }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
