//! Two-phase ridge penalty sweep
//!
//! Phase 1 scores a coarse grid by k-fold CV and brackets the two best
//! values. Phase 2 scores a linear grid inside that bracket. The winner is
//! refit on the whole training side and scored on the test side.

use super::{CancelToken, CandidateFailure, Evaluation, EvaluationTable, Grid};
use crate::data::{Dataset, Formula, Split};
use crate::error::{RegsearchError, Result};
use crate::metrics;
use crate::training::{linear_predict, CVResults, FitResult, KFold, LinearFitter};
use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default coarse penalties
pub const DEFAULT_COARSE_ALPHAS: [f64; 4] = [0.001, 0.1, 1.0, 10.0];

/// The refit production model and its held-out error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    pub fit: FitResult,
    pub test_mse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeOutcome {
    pub formula: Formula,
    pub coarse: EvaluationTable<f64>,
    /// `[low, high]` spanned by the two best coarse penalties
    pub bracket: Option<(f64, f64)>,
    pub refined: EvaluationTable<f64>,
    pub best: Option<Evaluation<f64>>,
    pub model: Option<RidgeModel>,
    pub cancelled: bool,
}

impl RidgeOutcome {
    fn new(formula: &Formula) -> Self {
        Self {
            formula: formula.clone(),
            coarse: EvaluationTable::new(),
            bracket: None,
            refined: EvaluationTable::new(),
            best: None,
            model: None,
            cancelled: false,
        }
    }
}

/// Coarse-then-refined penalty search driven by a [`LinearFitter`]
pub struct RidgeSweep<'a> {
    fitter: &'a dyn LinearFitter,
    coarse: Grid<f64>,
    refine_step: f64,
    max_refine_points: usize,
    kfold: KFold,
}

impl<'a> RidgeSweep<'a> {
    pub fn new(fitter: &'a dyn LinearFitter) -> Self {
        Self {
            fitter,
            coarse: Grid::new(DEFAULT_COARSE_ALPHAS.to_vec()),
            refine_step: 0.01,
            max_refine_points: 2001,
            kfold: KFold::new(5),
        }
    }

    pub fn with_coarse_grid(mut self, grid: Grid<f64>) -> Self {
        self.coarse = grid;
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

    pub fn with_kfold(mut self, kfold: KFold) -> Self {
        self.kfold = kfold;
        self
    }

    fn validate(&self, split: &Split, formula: &Formula) -> Result<()> {
        if self.coarse.len() < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "coarse penalty grid needs at least 2 values to bracket, got {}",
                self.coarse.len()
            )));
        }
        if let Some(alpha) = self.coarse.iter().find(|a| !(a.is_finite() && **a >= 0.0)) {
            return Err(RegsearchError::ConfigError(format!(
                "penalty must be a finite value >= 0, got {}",
                alpha
            )));
        }
        if !(self.refine_step > 0.0 && self.refine_step.is_finite()) {
            return Err(RegsearchError::ConfigError(format!(
                "refine step must be > 0, got {}",
                self.refine_step
            )));
        }
        if self.max_refine_points < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "max_refine_points must be >= 2, got {}",
                self.max_refine_points
            )));
        }
        if formula.is_empty() {
            return Err(RegsearchError::ConfigError(
                "ridge sweep needs at least one predictor".to_string(),
            ));
        }
        self.kfold.split(split.train.n_samples())?;
        split.train.resolve(formula)?;
        split.test.resolve(formula)?;
        Ok(())
    }

    /// Cross-validate every penalty of `grid`; failures are logged and kept
    /// out of the scored rows
    fn evaluate(
        &self,
        phase: &'static str,
        grid: &Grid<f64>,
        formula: &Formula,
        train: &Dataset,
        cancel: &CancelToken,
    ) -> Result<(EvaluationTable<f64>, bool)> {
        let results: Vec<Option<Result<CVResults>>> = grid
            .values()
            .par_iter()
            .map(|&alpha| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.fitter.cross_validate(formula, train, alpha, &self.kfold))
            })
            .collect();

        let mut table = EvaluationTable::new();
        let mut cancelled = false;
        for (&alpha, result) in grid.iter().zip(results) {
            match result {
                Some(Ok(cv)) => {
                    debug!(phase, alpha, cv_mse = cv.mean_score, cv_std = cv.std_score, "penalty scored");
                    table.push(alpha, cv.mean_score);
                }
                Some(Err(err @ RegsearchError::FitFailure { .. })) => {
                    warn!(phase, alpha, error = %err, "penalty candidate failed");
                    table.record_failure(CandidateFailure::new(alpha, &err));
                }
                Some(Err(err)) => return Err(err),
                None => cancelled = true,
            }
        }
        Ok((table, cancelled))
    }

    /// Run both phases on `split.train` and score the refit on `split.test`
    pub fn run(&self, split: &Split, formula: &Formula, cancel: &CancelToken) -> Result<RidgeOutcome> {
        self.validate(split, formula)?;
        let mut outcome = RidgeOutcome::new(formula);

        let (coarse, cancelled) = self.evaluate("coarse", &self.coarse, formula, &split.train, cancel)?;
        outcome.coarse = coarse;
        if cancelled {
            outcome.cancelled = true;
            return Ok(outcome);
        }
        let (low, high) = bracket(&outcome.coarse)
            .ok_or_else(|| RegsearchError::fit_failure(formula, "no coarse penalty could be fitted"))?;
        outcome.bracket = Some((low, high));

        let refined_grid = Grid::linear(low, high, self.refine_step, self.max_refine_points)?;
        info!(
            low,
            high,
            points = refined_grid.len(),
            "refining penalty grid"
        );

        let (refined, cancelled) = self.evaluate("refined", &refined_grid, formula, &split.train, cancel)?;
        outcome.refined = refined;
        if cancelled {
            outcome.cancelled = true;
            return Ok(outcome);
        }
        let best = outcome
            .refined
            .best()
            .cloned()
            .ok_or_else(|| RegsearchError::fit_failure(formula, "no refined penalty could be fitted"))?;

        let fit = self.fitter.fit(formula, &split.train, best.value)?;
        let x_test = split.test.design(formula)?;
        let predictions = linear_predict(fit.intercept, ArrayView1::from(&fit.coefficients), x_test.view())?;
        let test_mse = metrics::score(&predictions, split.test.target())?;

        info!(
            formula = %formula,
            alpha = best.value,
            cv_mse = best.mse,
            test_mse,
            "ridge sweep finished"
        );

        outcome.best = Some(best);
        outcome.model = Some(RidgeModel { fit, test_mse });
        Ok(outcome)
    }
}

/// `[min, max]` of the two lowest-error rows. A single scored row brackets
/// itself.
fn bracket(table: &EvaluationTable<f64>) -> Option<(f64, f64)> {
    let ranked = table.ranked();
    match ranked.as_slice() {
        [] => None,
        [only] => Some((only.value, only.value)),
        [first, second, ..] => Some((first.value.min(second.value), first.value.max(second.value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::split;
    use crate::training::NormalEquationFitter;
    use ndarray::{concatenate, Array1, Array2, Axis};

    fn noisy_plane() -> Split {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| match j {
            0 => (i % 13) as f64 - 6.0,
            _ => ((i * 5) % 17) as f64 - 8.0,
        });
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, r)| 2.0 + 1.5 * r[0] - 0.7 * r[1] + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        let ds = Dataset::new(vec!["a".into(), "b".into()], x, y).unwrap();
        split(&ds, 0.3, 42).unwrap()
    }

    #[test]
    fn test_refined_grid_inside_bracket() {
        let s = noisy_plane();
        let fitter = NormalEquationFitter::new();
        let formula = Formula::from_names(["a", "b"]).unwrap();
        let outcome = RidgeSweep::new(&fitter).run(&s, &formula, &CancelToken::new()).unwrap();

        let (low, high) = outcome.bracket.unwrap();
        assert_eq!(outcome.coarse.len(), 4);
        assert!(!outcome.refined.is_empty());
        assert!(outcome.refined.rows().iter().all(|r| r.value >= low && r.value <= high));

        let best = outcome.best.unwrap();
        assert!(best.value >= low && best.value <= high);
        let model = outcome.model.unwrap();
        assert_eq!(model.fit.penalty, best.value);
        assert!(model.test_mse.is_finite());
    }

    #[test]
    fn test_failed_penalty_kept_out_of_table() {
        let s = noisy_plane();
        let with_copy = |d: &Dataset| {
            let copy = d.features().column(0).insert_axis(Axis(1));
            let x = concatenate![Axis(1), d.features().view(), copy];
            Dataset::new(vec!["a".into(), "b".into(), "a_copy".into()], x, d.target().clone()).unwrap()
        };
        let s = Split {
            train: with_copy(&s.train),
            test: with_copy(&s.test),
            train_indices: s.train_indices,
            test_indices: s.test_indices,
        };
        let fitter = NormalEquationFitter::new();
        let formula = Formula::from_names(["a", "b", "a_copy"]).unwrap();

        // OLS on a duplicated column is singular; any positive penalty is not
        let outcome = RidgeSweep::new(&fitter)
            .with_coarse_grid(Grid::new(vec![0.0, 1.0, 2.0]))
            .run(&s, &formula, &CancelToken::new())
            .unwrap();

        assert_eq!(outcome.coarse.len(), 2);
        assert_eq!(outcome.coarse.failures().len(), 1);
        assert_eq!(outcome.coarse.failures()[0].candidate, "0");
        assert_eq!(outcome.bracket, Some((1.0, 2.0)));
        assert!(outcome.refined.failures().is_empty());
        let model = outcome.model.unwrap();
        assert!(model.fit.penalty >= 1.0 && model.fit.penalty <= 2.0);
        assert!(model.test_mse.is_finite());
    }

    #[test]
    fn test_bracket_uses_two_best() {
        let mut table = EvaluationTable::new();
        table.push(0.001, 3.0);
        table.push(0.1, 1.0);
        table.push(1.0, 2.0);
        table.push(10.0, 9.0);
        assert_eq!(bracket(&table), Some((0.1, 1.0)));

        let mut single = EvaluationTable::new();
        single.push(1.0, 2.0);
        assert_eq!(bracket(&single), Some((1.0, 1.0)));
    }

    #[test]
    fn test_single_coarse_value_rejected() {
        let s = noisy_plane();
        let fitter = NormalEquationFitter::new();
        let formula = Formula::from_names(["a"]).unwrap();
        let err = RidgeSweep::new(&fitter)
            .with_coarse_grid(Grid::new(vec![1.0]))
            .run(&s, &formula, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RegsearchError::ConfigError(_)));
    }

    #[test]
    fn test_too_many_folds_rejected() {
        let s = noisy_plane();
        let fitter = NormalEquationFitter::new();
        let formula = Formula::from_names(["a"]).unwrap();
        let err = RidgeSweep::new(&fitter)
            .with_kfold(KFold::new(500))
            .run(&s, &formula, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RegsearchError::ConfigError(_)));
    }

    #[test]
    fn test_cancelled_returns_no_model() {
        let s = noisy_plane();
        let fitter = NormalEquationFitter::new();
        let formula = Formula::from_names(["a", "b"]).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let outcome = RidgeSweep::new(&fitter).run(&s, &formula, &token).unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.model.is_none());
    }
}
