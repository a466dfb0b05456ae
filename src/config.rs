//! Pipeline configuration

use crate::data::NamedFormula;
use crate::error::{RegsearchError, Result};
use crate::preprocessing::ScalingPolicy;
use crate::selection::ridge::DEFAULT_COARSE_ALPHAS;
use crate::training::WeightScheme;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Share of rows held out for testing
    pub held_out_fraction: f64,

    /// Seed for the split and the CV folds
    pub seed: u64,

    /// Neighborhood sizes swept for KNN
    pub k_grid: Vec<usize>,

    /// Neighbor weighting for KNN
    pub weights: WeightScheme,

    /// Phase-1 ridge penalties
    pub coarse_alphas: Vec<f64>,

    /// Phase-2 ridge grid step
    pub refine_step: f64,

    /// Upper bound on phase-2 grid size
    pub max_refine_points: usize,

    /// Folds for ridge cross-validation
    pub cv_folds: usize,

    /// How the test side is standardized for KNN and ridge
    pub scaling: ScalingPolicy,

    /// Folk-knowledge model every other model is measured against
    pub baseline: Option<NamedFormula>,

    /// Fixed predictor subsets; the best one feeds KNN and ridge
    pub candidate_subsets: Vec<NamedFormula>,

    /// Worker threads (0 = one per core)
    pub n_jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            held_out_fraction: 0.3,
            seed: 42,
            k_grid: (2..=10).collect(),
            weights: WeightScheme::Uniform,
            coarse_alphas: DEFAULT_COARSE_ALPHAS.to_vec(),
            refine_step: 0.01,
            max_refine_points: 2001,
            cv_folds: 5,
            scaling: ScalingPolicy::TrainStatistics,
            baseline: None,
            candidate_subsets: Vec::new(),
            n_jobs: 0,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_held_out_fraction(mut self, fraction: f64) -> Self {
        self.held_out_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_k_grid(mut self, k_grid: Vec<usize>) -> Self {
        self.k_grid = k_grid;
        self
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_coarse_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.coarse_alphas = alphas;
        self
    }

    pub fn with_refine_step(mut self, step: f64) -> Self {
        self.refine_step = step;
        self
    }

    pub fn with_max_refine_points(mut self, max_points: usize) -> Self {
        self.max_refine_points = max_points;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingPolicy) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_baseline(mut self, baseline: NamedFormula) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_candidate_subsets(mut self, subsets: Vec<NamedFormula>) -> Self {
        self.candidate_subsets = subsets;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Check every setting that does not depend on the data
    pub fn validate(&self) -> Result<()> {
        if !(self.held_out_fraction > 0.0 && self.held_out_fraction < 1.0) {
            return Err(RegsearchError::ConfigError(format!(
                "held_out_fraction must be in (0, 1), got {}",
                self.held_out_fraction
            )));
        }
        if self.k_grid.is_empty() {
            return Err(RegsearchError::ConfigError("k_grid is empty".to_string()));
        }
        if self.k_grid.contains(&0) {
            return Err(RegsearchError::ConfigError("k_grid contains k = 0".to_string()));
        }
        if self.coarse_alphas.len() < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "coarse_alphas needs at least 2 values, got {}",
                self.coarse_alphas.len()
            )));
        }
        if let Some(a) = self.coarse_alphas.iter().find(|a| !(a.is_finite() && **a >= 0.0)) {
            return Err(RegsearchError::ConfigError(format!("invalid coarse alpha {}", a)));
        }
        if !(self.refine_step > 0.0 && self.refine_step.is_finite()) {
            return Err(RegsearchError::ConfigError(format!(
                "refine_step must be > 0, got {}",
                self.refine_step
            )));
        }
        if self.max_refine_points < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "max_refine_points must be >= 2, got {}",
                self.max_refine_points
            )));
        }
        if self.cv_folds < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "cv_folds must be >= 2, got {}",
                self.cv_folds
            )));
        }

        let mut names = HashSet::new();
        for named in self.baseline.iter().chain(self.candidate_subsets.iter()) {
            if named.name.is_empty() {
                return Err(RegsearchError::ConfigError("model names must not be empty".to_string()));
            }
            if !names.insert(named.name.as_str()) {
                return Err(RegsearchError::ConfigError(format!(
                    "model name '{}' used more than once",
                    named.name
                )));
            }
        }
        Ok(())
    }

    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Formula;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.held_out_fraction, 0.3);
        assert_eq!(config.k_grid, (2..=10).collect::<Vec<_>>());
        assert_eq!(config.coarse_alphas, vec![0.001, 0.1, 1.0, 10.0]);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.scaling, ScalingPolicy::TrainStatistics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let bad = PipelineConfig::new().with_held_out_fraction(1.0);
        assert!(matches!(bad.validate(), Err(RegsearchError::ConfigError(_))));
        assert!(PipelineConfig::new().with_k_grid(vec![]).validate().is_err());
        assert!(PipelineConfig::new().with_coarse_alphas(vec![1.0]).validate().is_err());
        assert!(PipelineConfig::new().with_cv_folds(1).validate().is_err());
        assert!(PipelineConfig::new().with_refine_step(0.0).validate().is_err());
    }

    #[test]
    fn test_duplicate_model_names() {
        let f = Formula::from_names(["sqft_living"]).unwrap();
        let config = PipelineConfig::new()
            .with_baseline(NamedFormula::new("folk", f.clone()))
            .with_candidate_subsets(vec![NamedFormula::new("folk", f)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "seed": 7,
            "scaling": "per_partition",
            "baseline": {"name": "folk", "formula": ["sqft_living", "grade"]}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.scaling, ScalingPolicy::PerPartition);
        assert_eq!(config.baseline.unwrap().formula.len(), 2);
        assert_eq!(config.cv_folds, 5);
    }

    #[test]
    fn test_json_file_round_trip() {
        let config = PipelineConfig::new().with_seed(9).with_n_jobs(2);
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), config.to_json().unwrap()).unwrap();
        assert_eq!(PipelineConfig::from_json_file(file.path()).unwrap(), config);
    }
}
