//! End-to-end model selection
//!
//! Wires the partitioner, the search engines and the comparator together:
//! split, then forward selection and fixed subsets on raw features, then the
//! KNN and ridge sweeps on standardized features, then one ranking by
//! held-out MSE.

use crate::config::PipelineConfig;
use crate::data::{self, Dataset, Formula, Split};
use crate::error::{RegsearchError, Result};
use crate::preprocessing::ScalerStats;
use crate::selection::{
    compare, evaluate_subsets, CancelToken, ForwardOutcome, ForwardSelection, Grid, NeighborOutcome,
    NeighborSweep, RankedModel, Ranking, RidgeOutcome, RidgeSweep, SubsetOutcome,
};
use crate::training::{KFold, LinearFitter, NormalEquationFitter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Comparator keys for each engine's winner
pub const BASELINE_MODEL: &str = "baseline";
pub const FORWARD_MODEL: &str = "forward_selection";
pub const SUBSET_MODEL: &str = "best_subset";
pub const KNN_MODEL: &str = "knn";
pub const RIDGE_MODEL: &str = "ridge";

/// Everything one run produced, as plain records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub created_at: DateTime<Utc>,
    pub fitter: String,
    pub config: PipelineConfig,
    pub target: String,
    pub n_train: usize,
    pub n_test: usize,
    pub forward: ForwardOutcome,
    pub baseline: Option<SubsetOutcome>,
    pub subsets: Option<SubsetOutcome>,
    /// Predictors used by the KNN and ridge sweeps
    pub sweep_formula: Option<Formula>,
    /// Training-side statistics used to standardize the sweeps' features
    pub scaler: Option<ScalerStats>,
    pub neighbors: Option<NeighborOutcome>,
    pub ridge: Option<RidgeOutcome>,
    pub ranking: Option<Ranking>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    /// The lowest-error model across all engines
    pub fn recommended(&self) -> Option<&RankedModel> {
        self.ranking.as_ref().and_then(|r| r.recommended())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    fitter: Box<dyn LinearFitter>,
}

impl Pipeline {
    /// Pipeline with the closed-form normal-equation fitter
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            fitter: Box::new(NormalEquationFitter::new()),
        }
    }

    /// Substitute another fitting backend
    pub fn with_fitter(mut self, fitter: impl LinearFitter + 'static) -> Self {
        self.fitter = Box::new(fitter);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reject anything that would fail mid-run, before any search starts
    fn validate(&self, dataset: &Dataset) -> Result<()> {
        let config = &self.config;
        config.validate()?;

        if dataset.n_predictors() == 0 {
            return Err(RegsearchError::DataError("dataset has no predictors".to_string()));
        }
        for named in config.baseline.iter().chain(config.candidate_subsets.iter()) {
            dataset.resolve(&named.formula)?;
        }

        let n = dataset.n_samples();
        let n_test = data::held_out_size(n, config.held_out_fraction);
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(RegsearchError::ConfigError(format!(
                "split of {} rows at fraction {} leaves an empty side",
                n, config.held_out_fraction
            )));
        }
        if let Some(&k) = config.k_grid.iter().find(|&&k| k > n_train) {
            return Err(RegsearchError::ConfigError(format!(
                "k = {} exceeds the {} training rows",
                k, n_train
            )));
        }
        if config.cv_folds > n_train {
            return Err(RegsearchError::ConfigError(format!(
                "{} folds exceed the {} training rows",
                config.cv_folds, n_train
            )));
        }
        Ok(())
    }

    /// Run every engine on `dataset` and rank their winners
    pub fn run(&self, dataset: &Dataset, cancel: &CancelToken) -> Result<PipelineReport> {
        self.validate(dataset)?;
        if cancel.is_cancelled() {
            return Err(RegsearchError::Cancelled);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_jobs)
            .build()
            .map_err(|e| RegsearchError::ConfigError(format!("Thread pool error: {}", e)))?;

        pool.install(|| self.execute(dataset, cancel))
    }

    fn execute(&self, dataset: &Dataset, cancel: &CancelToken) -> Result<PipelineReport> {
        let start = Instant::now();
        let config = &self.config;
        let fitter = self.fitter.as_ref();

        let split = data::split(dataset, config.held_out_fraction, config.seed)?;
        info!(
            rows = dataset.n_samples(),
            predictors = dataset.n_predictors(),
            n_train = split.train.n_samples(),
            n_test = split.test.n_samples(),
            seed = config.seed,
            "starting pipeline"
        );

        let forward = ForwardSelection::new(fitter).run(&split, cancel)?;

        let baseline = match &config.baseline {
            Some(b) => Some(evaluate_subsets(fitter, &split, std::slice::from_ref(b), cancel)?),
            None => None,
        };
        let subsets = if config.candidate_subsets.is_empty() {
            None
        } else {
            Some(evaluate_subsets(fitter, &split, &config.candidate_subsets, cancel)?)
        };

        let sweep_formula = subsets
            .as_ref()
            .and_then(|s| s.best())
            .map(|e| e.candidate.formula.clone())
            .or_else(|| forward.best.as_ref().map(|m| m.formula.clone()));

        let mut scaler = None;
        let mut neighbors = None;
        let mut ridge = None;

        match &sweep_formula {
            Some(formula) if !cancel.is_cancelled() => {
                let (scaled, stats) = split.standardize(config.scaling)?;
                scaler = Some(stats);
                neighbors = Some(self.sweep_neighbors(&scaled, formula, cancel)?);
                ridge = self.sweep_ridge(fitter, &scaled, formula, cancel)?;
            }
            Some(_) => {}
            None => warn!("no fitted formula available; skipping KNN and ridge sweeps"),
        }

        let mut results: Vec<(&str, f64)> = Vec::new();
        if let Some(b) = baseline.as_ref().and_then(|o| o.best()) {
            results.push((BASELINE_MODEL, b.test_mse));
        }
        if let Some(m) = &forward.best {
            results.push((FORWARD_MODEL, m.test_mse));
        }
        if let Some(s) = subsets.as_ref().and_then(|o| o.best()) {
            results.push((SUBSET_MODEL, s.test_mse));
        }
        if let Some(best) = neighbors.as_ref().and_then(|n| n.best.as_ref()) {
            results.push((KNN_MODEL, best.mse));
        }
        if let Some(model) = ridge.as_ref().and_then(|r| r.model.as_ref()) {
            results.push((RIDGE_MODEL, model.test_mse));
        }
        let ranking = if results.is_empty() {
            None
        } else {
            Some(compare(results)?)
        };

        let cancelled = cancel.is_cancelled()
            || forward.cancelled
            || baseline.as_ref().map_or(false, |o| o.cancelled)
            || subsets.as_ref().map_or(false, |o| o.cancelled)
            || neighbors.as_ref().map_or(false, |o| o.cancelled)
            || ridge.as_ref().map_or(false, |o| o.cancelled);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if let Some(best) = ranking.as_ref().and_then(|r| r.recommended()) {
            info!(
                recommended = %best.name,
                mse = best.mse,
                elapsed_ms,
                cancelled,
                "pipeline finished"
            );
        }

        Ok(PipelineReport {
            created_at: Utc::now(),
            fitter: fitter.name().to_string(),
            config: config.clone(),
            target: dataset.target_name().to_string(),
            n_train: split.train.n_samples(),
            n_test: split.test.n_samples(),
            forward,
            baseline,
            subsets,
            sweep_formula,
            scaler,
            neighbors,
            ridge,
            ranking,
            cancelled,
            elapsed_ms,
        })
    }

    fn sweep_neighbors(&self, scaled: &Split, formula: &Formula, cancel: &CancelToken) -> Result<NeighborOutcome> {
        NeighborSweep::new(Grid::new(self.config.k_grid.clone()))
            .with_weights(self.config.weights)
            .run(scaled, formula, cancel)
    }

    /// A ridge sweep that cannot fit any penalty is logged and left out of
    /// the ranking
    fn sweep_ridge(
        &self,
        fitter: &dyn LinearFitter,
        scaled: &Split,
        formula: &Formula,
        cancel: &CancelToken,
    ) -> Result<Option<RidgeOutcome>> {
        let config = &self.config;
        let sweep = RidgeSweep::new(fitter)
            .with_coarse_grid(Grid::new(config.coarse_alphas.clone()))
            .with_refine_step(config.refine_step)
            .with_max_refine_points(config.max_refine_points)
            .with_kfold(KFold::new(config.cv_folds).with_random_state(config.seed));

        match sweep.run(scaled, formula, cancel) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err @ RegsearchError::FitFailure { .. }) => {
                warn!(formula = %formula, error = %err, "ridge sweep produced no model");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
